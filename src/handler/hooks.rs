//! Optional session notifications.
//!
//! Every hook is optional; an unset hook is simply skipped.

use crate::rate_limiter::ThrottleEdge;

/// Notification without arguments.
pub type Hook = Box<dyn FnMut() + Send>;

/// Notification carrying an error description.
pub type ErrorHook = Box<dyn FnMut(&str) + Send>;

/// Notification of a throttling edge.
pub type ThrottleHook = Box<dyn FnMut(ThrottleEdge) + Send>;

/// Optional callbacks fired by the session.
#[derive(Default)]
pub struct SessionHooks {
    /// A network packet arrived, before any of its frames are handled.
    pub(crate) data_arrived: Option<Hook>,
    /// All frames of a network packet were handled.
    pub(crate) data_processed: Option<Hook>,
    /// The session became ready.
    pub(crate) session_start: Option<Hook>,
    /// The session ended (peer close, socket error or disconnect).
    pub(crate) session_end: Option<Hook>,
    /// A connection-level error occurred.
    pub(crate) session_error: Option<ErrorHook>,
    /// Outbound throttling started or stopped.
    pub(crate) throttle: Option<ThrottleHook>,
}

impl SessionHooks {
    pub(crate) fn data_arrived(&mut self) {
        fire(&mut self.data_arrived);
    }

    pub(crate) fn data_processed(&mut self) {
        fire(&mut self.data_processed);
    }

    pub(crate) fn session_start(&mut self) {
        fire(&mut self.session_start);
    }

    pub(crate) fn session_end(&mut self) {
        fire(&mut self.session_end);
    }

    pub(crate) fn session_error(&mut self, msg: &str) {
        if let Some(hook) = self.session_error.as_mut() {
            hook(msg);
        }
    }

    pub(crate) fn throttle(&mut self, edge: ThrottleEdge) {
        if let Some(hook) = self.throttle.as_mut() {
            hook(edge);
        }
    }
}

fn fire(hook: &mut Option<Hook>) {
    if let Some(hook) = hook.as_mut() {
        hook();
    }
}
