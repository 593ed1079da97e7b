//! Sliding-window throttling for outbound frames.
//!
//! The gateway disconnects clients that send too many messages in a short
//! period. The [`RateLimiter`] keeps the send timestamps of the trailing
//! interval and queues frames that would exceed the cap.
//!
//! # Usage
//!
//! The limiter holds no timers. Every call to [`RateLimiter::submit`] returns
//! an [`Admission`] telling the owner which frames to write now and when to
//! call again with no new frame. The session keeps that deadline in a single
//! slot, so re-entering the limiter replaces a pending flush instead of adding
//! a second one.
//!
//! # Configuration
//!
//! - `max_requests`: frames allowed per interval (default: 250)
//! - `interval`: length of the sliding window (default: 5s)

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

/// Default maximum frames per interval.
pub const DEFAULT_MAX_REQUESTS: usize = 250;

/// Default sliding window length.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(5);

/// Throttling state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleEdge {
    /// Frames started to queue.
    Started,
    /// The queue drained.
    Stopped,
}

/// Outcome of one admission pass.
#[derive(Debug, Default)]
pub struct Admission {
    /// Frames to hand to the transport now, in order.
    pub ready: Vec<Bytes>,
    /// When to run the next admission pass, if frames are still queued.
    pub flush_at: Option<Instant>,
    /// Throttling edge crossed during this pass.
    pub edge: Option<ThrottleEdge>,
}

/// Sliding-window rate limiter with a FIFO overflow queue.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum frames per interval.
    max_requests: usize,
    /// Window length.
    interval: Duration,
    /// Send timestamps inside the window, oldest first.
    window: VecDeque<Instant>,
    /// Frames waiting for window capacity, oldest first.
    queue: VecDeque<Bytes>,
    /// Whether frames are currently being held back.
    throttling: bool,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` frames per `interval`.
    ///
    /// A limit of zero is raised to one so queued frames can always drain.
    pub fn new(max_requests: usize, interval: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            interval,
            window: VecDeque::new(),
            queue: VecDeque::new(),
            throttling: false,
        }
    }

    /// Run one admission pass at time `now`.
    ///
    /// `frame` is appended behind any queued frames, then the queue drains
    /// head-first while the window has room. Pass `None` to flush only.
    pub fn submit(&mut self, now: Instant, frame: Option<Bytes>) -> Admission {
        self.evict(now);

        if let Some(frame) = frame {
            self.queue.push_back(frame);
        }

        let mut admission = Admission::default();
        while self.window.len() < self.max_requests {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            admission.ready.push(frame);
            self.window.push_back(now);
        }

        if !self.queue.is_empty() {
            if !self.throttling {
                self.throttling = true;
                admission.edge = Some(ThrottleEdge::Started);
            }
            admission.flush_at = self.window.front().map(|oldest| *oldest + self.interval);
        } else if self.throttling {
            self.throttling = false;
            admission.edge = Some(ThrottleEdge::Stopped);
        }

        admission
    }

    /// Drop timestamps whose age reached the interval.
    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.window.front() {
            if now.saturating_duration_since(*oldest) >= self.interval {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Check if frames are being held back.
    #[inline]
    pub fn is_throttling(&self) -> bool {
        self.throttling
    }

    /// Number of queued frames.
    #[inline]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Number of sends recorded in the current window.
    #[inline]
    pub fn in_window(&self) -> usize {
        self.window.len()
    }

    /// Get the per-interval limit.
    #[inline]
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Get the window length.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forget all timestamps and queued frames.
    pub fn reset(&mut self) {
        self.window.clear();
        self.queue.clear();
        self.throttling = false;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_REQUEST_INTERVAL)
    }
}
