//! Outbound field values and their token encoding.
//!
//! Requests are ordered lists of heterogeneous values. Each value renders to
//! one token (a contract renders to several) and every token is terminated by
//! the field separator.
//!
//! | Value                          | Token                          |
//! |--------------------------------|--------------------------------|
//! | `Unset`, `UNSET_*` sentinels   | empty                          |
//! | `Bool`                         | `1` / `0`                      |
//! | `Contract`                     | 13 sub-fields, `\0`-joined     |
//! | `TagValues`                    | `tag=value;` per pair          |
//! | anything else                  | display form                   |

use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::wire_format::{FIELD_SEPARATOR, PREFIX_SIZE};

/// Integer sentinel meaning "not set".
pub const UNSET_INTEGER: i32 = i32::MAX;

/// Double sentinel meaning "not set".
pub const UNSET_DOUBLE: f64 = f64::MAX;

/// Instrument descriptor as carried inside requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub con_id: i64,
    pub symbol: String,
    pub sec_type: String,
    pub last_trade_date_or_contract_month: String,
    pub strike: f64,
    pub right: String,
    pub multiplier: String,
    pub exchange: String,
    pub primary_exchange: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub include_expired: bool,
}

/// A `tag=value` option pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}

impl TagValue {
    /// Create a new pair.
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// One outbound field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Absent value, renders empty.
    Unset,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Contract(Box<ContractDescriptor>),
    TagValues(Vec<TagValue>),
}

impl Field {
    /// Append this value's token(s) and terminating separator to `out`.
    pub fn write_to(&self, out: &mut BytesMut) {
        let mut token = String::new();
        match self {
            Field::Unset => {}
            Field::Int(v) if *v == UNSET_INTEGER as i64 => {}
            Field::Int(v) => {
                let _ = write!(token, "{}", v);
            }
            Field::Float(v) if *v == UNSET_DOUBLE => {}
            Field::Float(v) => {
                let _ = write!(token, "{}", v);
            }
            Field::Bool(v) => token.push(if *v { '1' } else { '0' }),
            Field::Str(s) => token.push_str(s),
            Field::Contract(c) => {
                let parts = [
                    c.con_id.to_string(),
                    c.symbol.clone(),
                    c.sec_type.clone(),
                    c.last_trade_date_or_contract_month.clone(),
                    c.strike.to_string(),
                    c.right.clone(),
                    c.multiplier.clone(),
                    c.exchange.clone(),
                    c.primary_exchange.clone(),
                    c.currency.clone(),
                    c.local_symbol.clone(),
                    c.trading_class.clone(),
                    if c.include_expired { "1" } else { "0" }.to_string(),
                ];
                token = parts.join("\0");
            }
            Field::TagValues(pairs) => {
                for pair in pairs {
                    let _ = write!(token, "{}={};", pair.tag, pair.value);
                }
            }
        }
        out.extend_from_slice(token.as_bytes());
        out.put_u8(FIELD_SEPARATOR);
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v as i64)
    }
}

impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Int(v)
    }
}

impl From<u32> for Field {
    fn from(v: u32) -> Self {
        Field::Int(v as i64)
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Float(v)
    }
}

impl From<bool> for Field {
    fn from(v: bool) -> Self {
        Field::Bool(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(v)
    }
}

impl From<ContractDescriptor> for Field {
    fn from(v: ContractDescriptor) -> Self {
        Field::Contract(Box::new(v))
    }
}

impl From<Vec<TagValue>> for Field {
    fn from(v: Vec<TagValue>) -> Self {
        Field::TagValues(v)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(v: Option<T>) -> Self {
        v.map_or(Field::Unset, Into::into)
    }
}

/// Encode a field list into a complete length-prefixed frame.
///
/// # Example
///
/// ```
/// use venue_client::protocol::{encode_fields, Field};
///
/// let bytes = encode_fields(&[Field::from(71), Field::from(2), Field::from(true)]);
/// assert_eq!(&bytes[..], b"\0\0\0\x0771\x002\x001\0");
/// ```
pub fn encode_fields(fields: &[Field]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PREFIX_SIZE + fields.len() * 8);
    buf.put_u32(0);
    for field in fields {
        field.write_to(&mut buf);
    }
    let body_len = (buf.len() - PREFIX_SIZE) as u32;
    buf[..PREFIX_SIZE].copy_from_slice(&body_len.to_be_bytes());
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_prefix, FrameBuffer};

    fn body(fields: &[Field]) -> Vec<u8> {
        encode_fields(fields)[PREFIX_SIZE..].to_vec()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(body(&[Field::from(42)]), b"42\0");
        assert_eq!(body(&[Field::from(-7i64)]), b"-7\0");
        assert_eq!(body(&[Field::from(1.5)]), b"1.5\0");
        assert_eq!(body(&[Field::from("SMART")]), b"SMART\0");
    }

    #[test]
    fn test_booleans_render_as_digits() {
        assert_eq!(body(&[Field::from(true), Field::from(false)]), b"1\00\0");
    }

    #[test]
    fn test_sentinels_render_empty() {
        let fields = [
            Field::Unset,
            Field::from(UNSET_INTEGER),
            Field::from(UNSET_DOUBLE),
            Field::from(None::<i32>),
        ];
        assert_eq!(body(&fields), b"\0\0\0\0");
    }

    #[test]
    fn test_some_renders_inner_value() {
        assert_eq!(body(&[Field::from(Some(5))]), b"5\0");
    }

    #[test]
    fn test_contract_renders_thirteen_subfields() {
        let contract = ContractDescriptor {
            con_id: 265598,
            symbol: "AAPL".into(),
            sec_type: "STK".into(),
            strike: 0.0,
            exchange: "SMART".into(),
            primary_exchange: "NASDAQ".into(),
            currency: "USD".into(),
            include_expired: true,
            ..Default::default()
        };

        let encoded = body(&[Field::from(contract)]);
        assert_eq!(encoded, b"265598\0AAPL\0STK\0\00\0\0\0SMART\0NASDAQ\0USD\0\0\01\0");

        let separators = encoded.iter().filter(|b| **b == FIELD_SEPARATOR).count();
        assert_eq!(separators, 13);
    }

    #[test]
    fn test_tag_values() {
        let pairs = vec![TagValue::new("a", "1"), TagValue::new("b", "x y")];
        assert_eq!(body(&[Field::from(pairs)]), b"a=1;b=x y;\0");
        assert_eq!(body(&[Field::from(Vec::<TagValue>::new())]), b"\0");
    }

    #[test]
    fn test_prefix_matches_body_length() {
        let bytes = encode_fields(&[Field::from(71), Field::from(2), Field::from(7)]);
        assert_eq!(decode_prefix(&bytes), Some((bytes.len() - PREFIX_SIZE) as u32));
    }

    #[test]
    fn test_encoded_fields_decode_back() {
        let fields = [
            Field::from(17),
            Field::from("EUR.USD"),
            Field::Unset,
            Field::from(false),
            Field::from(2.25),
        ];

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&encode_fields(&fields)).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0],
            crate::protocol::Frame::from_strs(&["17", "EUR.USD", "", "0", "2.25"])
        );
    }
}
