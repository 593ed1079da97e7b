//! Frame struct with typed field accessors.
//!
//! A frame is the decoded body of one length-prefixed message: an ordered
//! list of fields. Uses `bytes::Bytes` so fields share the inbound buffer.
//!
//! # Example
//!
//! ```
//! use venue_client::protocol::Frame;
//!
//! let frame = Frame::from_strs(&["9", "1", "17"]);
//!
//! assert_eq!(frame.kind().unwrap(), 9);
//! assert_eq!(frame.parse::<i64>(2).unwrap(), 17);
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{FIELD_SEPARATOR, PREFIX_SIZE};
use crate::error::{ClientError, Result};

/// A complete decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    fields: Vec<Bytes>,
}

impl Frame {
    /// Create a frame from already split fields.
    pub fn new(fields: Vec<Bytes>) -> Self {
        Self { fields }
    }

    /// Create a frame from string fields (copies data).
    pub fn from_strs(fields: &[&str]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|f| Bytes::copy_from_slice(f.as_bytes()))
                .collect(),
        }
    }

    /// All fields in wire order.
    #[inline]
    pub fn fields(&self) -> &[Bytes] {
        &self.fields
    }

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the frame has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw bytes of field `index`.
    #[inline]
    pub fn field(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).map(|f| &f[..])
    }

    /// Field `index` as UTF-8 text.
    pub fn str(&self, index: usize) -> Result<&str> {
        let raw = self
            .field(index)
            .ok_or_else(|| ClientError::Decode(format!("missing field {}", index)))?;
        std::str::from_utf8(raw)
            .map_err(|e| ClientError::Decode(format!("field {} is not UTF-8: {}", index, e)))
    }

    /// Parse field `index` into any `FromStr` type.
    pub fn parse<T>(&self, index: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.str(index)?;
        text.parse::<T>()
            .map_err(|e| ClientError::Decode(format!("field {} ({:?}): {}", index, text, e)))
    }

    /// Numeric message kind carried in the first field.
    #[inline]
    pub fn kind(&self) -> Result<i32> {
        self.parse(0)
    }

    /// Fail unless the frame has exactly `expected` fields.
    pub fn expect_len(&self, expected: usize) -> Result<()> {
        if self.fields.len() != expected {
            return Err(ClientError::Decode(format!(
                "expected {} fields, got {}",
                expected,
                self.fields.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&String::from_utf8_lossy(field))?;
        }
        Ok(())
    }
}

/// Build a complete wire frame from string fields.
///
/// Each field is terminated by the separator and the body is prefixed with
/// its length.
pub fn build_frame(fields: &[&str]) -> Bytes {
    let body_len: usize = fields.iter().map(|f| f.len() + 1).sum();
    let mut buf = BytesMut::with_capacity(PREFIX_SIZE + body_len);
    buf.put_u32(body_len as u32);
    for field in fields {
        buf.extend_from_slice(field.as_bytes());
        buf.put_u8(FIELD_SEPARATOR);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_prefix;

    #[test]
    fn test_accessors() {
        let frame = Frame::from_strs(&["46", "1", "5", "45", "1700000000"]);

        assert_eq!(frame.len(), 5);
        assert!(!frame.is_empty());
        assert_eq!(frame.kind().unwrap(), 46);
        assert_eq!(frame.str(3).unwrap(), "45");
        assert_eq!(frame.field(4), Some(&b"1700000000"[..]));
        assert!(frame.field(5).is_none());
    }

    #[test]
    fn test_parse_errors_name_the_field() {
        let frame = Frame::from_strs(&["x", "1"]);

        let err = frame.kind().unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.to_string().contains("field 0"));

        let err = frame.parse::<i32>(7).unwrap_err();
        assert!(err.to_string().contains("missing field 7"));
    }

    #[test]
    fn test_non_utf8_field() {
        let frame = Frame::new(vec![Bytes::from_static(&[0xff, 0xfe])]);
        assert!(frame.str(0).is_err());
    }

    #[test]
    fn test_expect_len() {
        let frame = Frame::from_strs(&["2", "1", "5", "0", "100"]);
        assert!(frame.expect_len(5).is_ok());
        assert!(frame.expect_len(7).is_err());
    }

    #[test]
    fn test_display_joins_with_commas() {
        let frame = Frame::from_strs(&["15", "1", "DU1234,DU5678"]);
        assert_eq!(frame.to_string(), "15,1,DU1234,DU5678");
    }

    #[test]
    fn test_build_frame_layout() {
        let bytes = build_frame(&["9", "1", "17"]);

        assert_eq!(decode_prefix(&bytes), Some(7));
        assert_eq!(&bytes[PREFIX_SIZE..], b"9\01\017\0");
    }

    #[test]
    fn test_build_frame_empty_field() {
        let bytes = build_frame(&["1", ""]);
        assert_eq!(&bytes[PREFIX_SIZE..], b"1\0\0");
    }
}
