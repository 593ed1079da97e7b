//! Per-connection session record.

use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::time::Instant;

/// Connection lifecycle.
///
/// ```text
/// Disconnected → Connecting → SocketConnected → Negotiated → Ready
///       ↑______________ error / peer close / disconnect ______|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnState {
    Disconnected,
    Connecting,
    SocketConnected,
    Negotiated,
    Ready,
}

impl ConnState {
    /// Check if outbound requests may be sent.
    #[inline]
    pub fn can_send(self) -> bool {
        matches!(self, ConnState::Negotiated | ConnState::Ready)
    }
}

/// Two flags that must both be set before the session is ready.
///
/// Order does not matter. Only a full reset clears them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyBarrier {
    next_valid_id: bool,
    managed_accounts: bool,
}

impl ReadyBarrier {
    pub fn mark_next_valid_id(&mut self) {
        self.next_valid_id = true;
    }

    pub fn mark_managed_accounts(&mut self) {
        self.managed_accounts = true;
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.next_valid_id && self.managed_accounts
    }
}

/// Snapshot of traffic counters for a ready session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStats {
    /// Wall-clock time the connect attempt started.
    pub start_time: SystemTime,
    /// Time since the connect attempt started.
    pub uptime: Duration,
    /// Connection time reported by the gateway during negotiation.
    pub connection_time: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub messages_sent: u64,
}

/// State of one connection attempt, zeroed on every reset.
#[derive(Debug)]
pub(crate) struct Session {
    pub state: ConnState,
    pub client_id: i32,
    pub server_version: Option<i32>,
    /// Opaque connection time reported by the gateway.
    pub connection_time: Option<String>,
    pub next_request_id: i64,
    pub accounts: Vec<String>,
    pub barrier: ReadyBarrier,
    pub start_time: SystemTime,
    pub started: Instant,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub messages_sent: u64,
}

impl Session {
    /// Fresh record for a connect attempt.
    pub fn connecting(client_id: i32) -> Self {
        Self {
            state: ConnState::Connecting,
            client_id,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            start_time: self.start_time,
            uptime: self.started.elapsed(),
            connection_time: self.connection_time.clone().unwrap_or_default(),
            bytes_received: self.bytes_received,
            bytes_sent: self.bytes_sent,
            messages_received: self.messages_received,
            messages_sent: self.messages_sent,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: ConnState::Disconnected,
            client_id: 0,
            server_version: None,
            connection_time: None,
            next_request_id: 0,
            accounts: Vec::new(),
            barrier: ReadyBarrier::default(),
            start_time: SystemTime::now(),
            started: Instant::now(),
            bytes_received: 0,
            bytes_sent: 0,
            messages_received: 0,
            messages_sent: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_needs_both_flags() {
        let mut barrier = ReadyBarrier::default();
        assert!(!barrier.is_clear());
        barrier.mark_managed_accounts();
        assert!(!barrier.is_clear());
        barrier.mark_next_valid_id();
        assert!(barrier.is_clear());
    }

    #[test]
    fn test_fresh_session_is_zeroed() {
        let session = Session::connecting(7);
        assert_eq!(session.state, ConnState::Connecting);
        assert_eq!(session.client_id, 7);
        assert_eq!(session.server_version, None);

        let stats = session.stats();
        assert_eq!(stats.bytes_received, 0);
        assert_eq!(stats.messages_sent, 0);
    }

    #[test]
    fn test_can_send() {
        assert!(!ConnState::Connecting.can_send());
        assert!(!ConnState::SocketConnected.can_send());
        assert!(ConnState::Negotiated.can_send());
        assert!(ConnState::Ready.can_send());
    }
}
