//! Tagged text codec for persisted series values.
//!
//! A value (without its column, which the caller carries) is one tag byte followed by
//! a UTF-8 payload: `d<f64>`, `l<i64>`, `s<text>`, `b<true|false>`, `j<json object>`.
//! Arrays and streams have no wire form. A bare decimal may be NaN or infinite, but
//! a structure is JSON and refuses to encode while any member decimal is non-finite.

use serfun_core::error::{Error, Result};
use serfun_core::{Column, SeriesValue, Structure, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Decimal = b'd',
    Long = b'l',
    String = b's',
    Boolean = b'b',
    Structure = b'j',
}

impl Tag {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            b'd' => Ok(Tag::Decimal),
            b'l' => Ok(Tag::Long),
            b's' => Ok(Tag::String),
            b'b' => Ok(Tag::Boolean),
            b'j' => Ok(Tag::Structure),
            other => Err(Error::Decode(format!(
                "unrecognized tag byte 0x{other:02x}"
            ))),
        }
    }
}

pub struct SeriesValueCodec;

impl SeriesValueCodec {
    pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
        let (tag, payload) = match value {
            Value::Decimal(d) => (Tag::Decimal, d.to_string()),
            Value::Long(n) => (Tag::Long, n.to_string()),
            Value::String(s) => (Tag::String, s.clone()),
            Value::Boolean(b) => (Tag::Boolean, b.to_string()),
            Value::Structure(s) => (Tag::Structure, s.to_json()?),
            Value::Array(_) | Value::Stream(_) => {
                return Err(Error::WrongVariant {
                    attempted: "encoded value",
                    actual: value.kind(),
                })
            }
        };
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(tag as u8);
        out.extend_from_slice(payload.as_bytes());
        Ok(out)
    }

    /// Encode the payload of `v`; its column is not part of the bytes.
    pub fn encode(v: &SeriesValue) -> Result<Vec<u8>> {
        Self::encode_value(&v.value)
    }

    pub fn decode_value(bytes: &[u8]) -> Result<Value> {
        let (&first, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::Decode("empty value encoding".into()))?;
        let tag = Tag::from_u8(first)?;
        let text = std::str::from_utf8(rest)
            .map_err(|e| Error::Decode(format!("payload is not UTF-8: {e}")))?;
        match tag {
            Tag::Decimal => text
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|e| Error::Decode(format!("bad decimal '{text}': {e}"))),
            Tag::Long => text
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|e| Error::Decode(format!("bad long '{text}': {e}"))),
            Tag::String => Ok(Value::String(text.to_string())),
            Tag::Boolean => match text {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                other => Err(Error::Decode(format!("bad boolean '{other}'"))),
            },
            Tag::Structure => Ok(Value::Structure(Structure::parse_json(text)?)),
        }
    }

    pub fn decode(column: impl Into<Column>, bytes: &[u8]) -> Result<SeriesValue> {
        Ok(SeriesValue {
            column: column.into(),
            value: Self::decode_value(bytes)?,
        })
    }
}
