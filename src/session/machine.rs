//! Synchronous session state machine.
//!
//! [`StateMachine`] owns everything about a connection except the socket and
//! the clock. The actor feeds it socket events and the current time, then
//! writes whatever it left in the outbox. Keeping I/O out of here lets the
//! handshake, the barrier and throttling be driven directly from tests.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use super::state::{ConnState, ConnectionStats, Session};
use crate::config::ClientConfig;
use crate::dispatch::{Control, Router};
use crate::error::{ClientError, Result};
use crate::handler::SessionHooks;
use crate::protocol::{
    describe_frame, encode_fields, handshake_preamble, outgoing, Field, Frame, FrameBuffer,
    MIN_SERVER_VER_OPTIONAL_CAPABILITIES, START_API_VERSION,
};
use crate::rate_limiter::{RateLimiter, ThrottleEdge};

/// Connection state, codec buffers, limiter and router for one client.
pub(crate) struct StateMachine {
    session: Session,
    frames: FrameBuffer,
    limiter: RateLimiter,
    router: Router,
    hooks: SessionHooks,
    /// Encoded bytes ready for the transport, in send order.
    outbox: Vec<Bytes>,
    /// Single pending flush deadline.
    flush_at: Option<Instant>,
    min_version: i32,
    max_version: i32,
    optional_capabilities: String,
}

impl StateMachine {
    pub fn new(config: &ClientConfig, router: Router, hooks: SessionHooks) -> Self {
        Self {
            session: Session::default(),
            frames: FrameBuffer::with_max_frame_size(config.max_frame_size),
            limiter: RateLimiter::new(config.max_requests, config.request_interval),
            router,
            hooks,
            outbox: Vec::new(),
            flush_at: None,
            min_version: config.min_client_version,
            max_version: config.max_client_version,
            optional_capabilities: config.optional_capabilities.clone(),
        }
    }

    /// Start a new connect attempt with a zeroed session.
    pub fn begin_connect(&mut self, client_id: i32) -> Result<()> {
        if self.session.state != ConnState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        self.reset();
        self.session = Session::connecting(client_id);
        Ok(())
    }

    /// The socket is open: queue the handshake preamble.
    ///
    /// The preamble is not a request and bypasses the rate limiter.
    pub fn on_socket_connected(&mut self) {
        self.session.state = ConnState::SocketConnected;
        tracing::info!(
            "Connected, requesting client versions v{}..{}",
            self.min_version,
            self.max_version
        );
        self.outbox
            .push(handshake_preamble(self.min_version, self.max_version));
    }

    /// Handle one socket delivery.
    ///
    /// Returns `true` if the session became ready while handling it. A
    /// failing frame is logged and skipped. An `Err` is a stream-level
    /// protocol violation and the caller must tear the connection down.
    pub fn on_data(&mut self, now: Instant, data: &[u8]) -> Result<bool> {
        if self.session.state == ConnState::Disconnected {
            return Ok(false);
        }

        self.hooks.data_arrived();
        self.session.bytes_received += data.len() as u64;

        let frames = match self.frames.push(data) {
            Ok(frames) => frames,
            Err(e) => {
                self.hooks.data_processed();
                return Err(e);
            }
        };
        let was_ready = self.session.state == ConnState::Ready;
        for frame in &frames {
            self.session.messages_received += 1;
            tracing::debug!("<<< {}", frame);
            self.handle_frame(now, frame);
        }

        self.hooks.data_processed();
        Ok(!was_ready && self.session.state == ConnState::Ready)
    }

    fn handle_frame(&mut self, now: Instant, frame: &Frame) {
        if self.session.server_version.is_none() && frame.len() == 2 {
            self.negotiate(now, frame);
            return;
        }

        if !self.session.state.can_send() {
            tracing::warn!("Dropping frame received before negotiation: {}", frame);
            return;
        }

        let dispatched = self.router.route(frame);
        if let Some(control) = dispatched.control {
            self.apply(control);
        }
        if let Err(e) = dispatched.outcome {
            tracing::error!("Failed to process message {}: {}", frame, e);
        }
    }

    fn negotiate(&mut self, now: Instant, frame: &Frame) {
        let version: i32 = match frame.parse(0) {
            Ok(version) => version,
            Err(e) => {
                tracing::error!("Invalid version negotiation reply {}: {}", frame, e);
                return;
            }
        };
        let connection_time = frame.str(1).map(str::to_string).unwrap_or_default();
        tracing::info!(
            "Server version: {} Connection time: {}",
            version,
            connection_time
        );

        self.session.server_version = Some(version);
        self.session.connection_time = Some(connection_time);
        self.session.state = ConnState::Negotiated;
        self.router.on_negotiated(version);

        let mut fields = vec![
            Field::from(outgoing::START_API),
            Field::from(START_API_VERSION),
            Field::from(self.session.client_id),
        ];
        if version >= MIN_SERVER_VER_OPTIONAL_CAPABILITIES {
            fields.push(Field::from(self.optional_capabilities.as_str()));
        }
        self.admit(now, Some(encode_fields(&fields)));
    }

    fn apply(&mut self, control: Control) {
        match control {
            Control::NextValidId(id) => {
                // Later reseeds never move the counter backwards.
                self.session.next_request_id = if self.session.state == ConnState::Ready {
                    self.session.next_request_id.max(id)
                } else {
                    id
                };
                self.session.barrier.mark_next_valid_id();
            }
            Control::ManagedAccounts(accounts) => {
                self.session.accounts = accounts;
                self.session.barrier.mark_managed_accounts();
            }
        }

        if self.session.state == ConnState::Negotiated && self.session.barrier.is_clear() {
            self.session.state = ConnState::Ready;
            tracing::info!(
                "Session ready, next request id {}, accounts {}",
                self.session.next_request_id,
                self.session.accounts.join(",")
            );
            self.hooks.session_start();
        }
    }

    /// Encode a request and pass it through the rate limiter.
    pub fn send_fields(&mut self, now: Instant, fields: &[Field]) -> Result<()> {
        if !self.session.state.can_send() {
            return Err(ClientError::NotConnected);
        }
        self.admit(now, Some(encode_fields(fields)));
        Ok(())
    }

    /// Re-run admission for queued frames.
    pub fn flush(&mut self, now: Instant) {
        self.admit(now, None);
    }

    fn admit(&mut self, now: Instant, frame: Option<Bytes>) {
        let admission = self.limiter.submit(now, frame);
        for frame in admission.ready {
            tracing::debug!(">>> {}", describe_frame(&frame));
            self.outbox.push(frame);
        }
        self.flush_at = admission.flush_at;

        match admission.edge {
            Some(ThrottleEdge::Started) => {
                tracing::warn!("Started to throttle requests");
                self.hooks.throttle(ThrottleEdge::Started);
            }
            Some(ThrottleEdge::Stopped) => {
                tracing::warn!("Stopped to throttle requests");
                self.hooks.throttle(ThrottleEdge::Stopped);
            }
            None => {}
        }
    }

    /// Take the bytes waiting for the transport.
    pub fn take_outbox(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.outbox)
    }

    /// When the limiter wants to be flushed again.
    #[inline]
    pub fn flush_at(&self) -> Option<Instant> {
        self.flush_at
    }

    /// Count bytes handed to the transport.
    pub fn record_sent(&mut self, bytes: usize) {
        self.session.bytes_sent += bytes as u64;
        self.session.messages_sent += 1;
    }

    /// The peer closed the socket.
    pub fn on_peer_closed(&mut self) -> ClientError {
        let reason = if self.session.state == ConnState::Ready {
            "peer closed the socket".to_string()
        } else {
            format!("client id {} already in use?", self.session.client_id)
        };
        self.on_error(ClientError::ConnectionClosed(reason))
    }

    /// The socket failed while reading or writing.
    pub fn on_socket_error(&mut self, description: &str) -> ClientError {
        self.on_error(ClientError::ConnectionClosed(format!(
            "socket error: {}",
            description
        )))
    }

    /// Opening the socket failed.
    pub fn on_connect_failed(&mut self, err: io::Error) -> ClientError {
        if err.kind() == io::ErrorKind::ConnectionRefused {
            tracing::error!("Make sure API port on the gateway is open");
        }
        self.on_error(ClientError::Io(err))
    }

    /// The session was not ready in time.
    pub fn on_connect_timeout(&mut self, timeout: Duration) -> ClientError {
        self.on_error(ClientError::Timeout(timeout))
    }

    /// Report a connection-level error and end the session.
    ///
    /// The error is handed back so the caller can resolve a pending connect.
    pub fn on_error(&mut self, err: ClientError) -> ClientError {
        if self.session.state == ConnState::Disconnected {
            return err;
        }
        let msg = err.to_string();
        tracing::error!("Session error: {}", msg);
        self.reset();
        self.hooks.session_error(&msg);
        self.hooks.session_end();
        err
    }

    /// End the session on request. Returns `false` if there was none.
    pub fn disconnect(&mut self) -> bool {
        if self.session.state == ConnState::Disconnected {
            return false;
        }
        tracing::info!("Disconnecting client id {}", self.session.client_id);
        self.reset();
        self.hooks.session_end();
        true
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.frames.clear();
        self.limiter.reset();
        self.outbox.clear();
        self.flush_at = None;
    }

    #[inline]
    pub fn state(&self) -> ConnState {
        self.session.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.session.state == ConnState::Ready
    }

    fn require_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Hand out a request id. Ids are never reused within a session.
    pub fn next_request_id(&mut self) -> Result<i64> {
        self.require_ready()?;
        let id = self.session.next_request_id;
        self.session.next_request_id = id.checked_add(1).ok_or_else(|| {
            ClientError::Protocol(format!("request id {} cannot be advanced", id))
        })?;
        Ok(id)
    }

    pub fn account_names(&self) -> Result<Vec<String>> {
        self.require_ready()?;
        Ok(self.session.accounts.clone())
    }

    pub fn connection_stats(&self) -> Result<ConnectionStats> {
        self.require_ready()?;
        Ok(self.session.stats())
    }

    /// Negotiated server version, available from `Negotiated` on.
    pub fn server_version(&self) -> Result<i32> {
        self.session.server_version.ok_or(ClientError::NotConnected)
    }
}
