//! Protocol module - wire format, framing, and field encoding.
//!
//! This module implements the frame codec:
//! - 4-byte big-endian length prefix and the handshake preamble
//! - Frame buffer for reassembling partial reads
//! - Field values and their token encoding for outbound requests

mod field;
mod frame;
mod frame_buffer;
mod wire_format;

pub use field::{encode_fields, ContractDescriptor, Field, TagValue, UNSET_DOUBLE, UNSET_INTEGER};
pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    decode_prefix, describe_frame, encode_prefix, handshake_preamble, incoming, outgoing,
    prefix_body, API_MAGIC, DEFAULT_MAX_FRAME_SIZE, FIELD_SEPARATOR, MAX_CLIENT_VERSION,
    MIN_CLIENT_VERSION, MIN_SERVER_VER_OPTIONAL_CAPABILITIES, PREFIX_SIZE, START_API_VERSION,
};
