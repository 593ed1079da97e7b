//! Wire format encoding and decoding.
//!
//! Every message after the handshake is a length-prefixed frame:
//! ```text
//! ┌────────────┬───────────────────────────────────────┐
//! │ Length     │ Body                                  │
//! │ 4 bytes BE │ field \0 field \0 ... field \0        │
//! └────────────┴───────────────────────────────────────┘
//! ```
//!
//! The length counts body bytes only. The handshake preamble is the only
//! exception: `"API\0"` followed by a prefixed `v<min>..<max>` string.

use bytes::{BufMut, Bytes, BytesMut};

/// Length prefix size in bytes (fixed, exactly 4).
pub const PREFIX_SIZE: usize = 4;

/// Byte that separates and terminates body fields.
pub const FIELD_SEPARATOR: u8 = 0;

/// Magic bytes opening the handshake.
pub const API_MAGIC: &[u8; 4] = b"API\0";

/// Default maximum accepted body size (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Lowest protocol version this client can speak.
pub const MIN_CLIENT_VERSION: i32 = 100;

/// Highest protocol version this client can speak.
pub const MAX_CLIENT_VERSION: i32 = 151;

/// First server version that accepts optional capabilities in start-API.
pub const MIN_SERVER_VER_OPTIONAL_CAPABILITIES: i32 = 72;

/// Version of the start-API message layout.
pub const START_API_VERSION: i32 = 2;

/// Message kinds received from the gateway that this layer inspects.
pub mod incoming {
    /// Price tick (fast-pathed only with a combined price/size handler).
    pub const TICK_PRICE: i32 = 1;
    /// Size-only tick.
    pub const TICK_SIZE: i32 = 2;
    /// Next valid request id (readiness barrier).
    pub const NEXT_VALID_ID: i32 = 9;
    /// Market depth update.
    pub const MARKET_DEPTH: i32 = 12;
    /// Managed accounts list (readiness barrier).
    pub const MANAGED_ACCOUNTS: i32 = 15;
    /// String-valued tick.
    pub const TICK_STRING: i32 = 46;
}

/// Message kinds sent to the gateway by this layer.
pub mod outgoing {
    /// Start API control message, sent right after negotiation.
    pub const START_API: i32 = 71;
}

/// Encode a body length as a big-endian prefix.
#[inline]
pub fn encode_prefix(len: u32) -> [u8; PREFIX_SIZE] {
    len.to_be_bytes()
}

/// Decode a big-endian length prefix.
///
/// Returns `None` if fewer than 4 bytes are available.
///
/// # Example
///
/// ```
/// use venue_client::protocol::decode_prefix;
///
/// assert_eq!(decode_prefix(&[0, 0, 1, 2, 99]), Some(258));
/// assert_eq!(decode_prefix(&[0, 0, 1]), None);
/// ```
#[inline]
pub fn decode_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Prepend the length prefix to an encoded body.
pub fn prefix_body(body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PREFIX_SIZE + body.len());
    buf.put_u32(body.len() as u32);
    buf.extend_from_slice(body);
    buf.freeze()
}

/// Build the handshake preamble: magic bytes plus the prefixed version range.
///
/// # Example
///
/// ```
/// use venue_client::protocol::handshake_preamble;
///
/// let bytes = handshake_preamble(100, 151);
/// assert_eq!(&bytes[..], b"API\0\0\0\0\x09v100..151");
/// ```
pub fn handshake_preamble(min_version: i32, max_version: i32) -> Bytes {
    let range = format!("v{}..{}", min_version, max_version);
    let mut buf = BytesMut::with_capacity(API_MAGIC.len() + PREFIX_SIZE + range.len());
    buf.extend_from_slice(API_MAGIC);
    buf.put_u32(range.len() as u32);
    buf.extend_from_slice(range.as_bytes());
    buf.freeze()
}

/// Render an encoded frame as comma-joined fields for debug logging.
pub fn describe_frame(bytes: &[u8]) -> String {
    let body = bytes.get(PREFIX_SIZE..).unwrap_or_default();
    let mut parts: Vec<String> = body
        .split(|b| *b == FIELD_SEPARATOR)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    parts.pop();
    parts.join(",")
}
