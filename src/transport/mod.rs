//! Transport module - raw byte pipe to the gateway.
//!
//! Provides a TCP connection that surfaces data, clean close and socket
//! errors as [`TransportEvent`]s. Any `AsyncRead + AsyncWrite` stream can be
//! wrapped, which keeps the session testable over in-memory pipes.

mod tcp;

pub use tcp::{Transport, TransportEvent, DEFAULT_READ_BUFFER_SIZE};
