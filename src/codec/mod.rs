#![forbid(unsafe_code)]

//! Key/path codec.
//!
//! Query keys (field names, cursors, tuples, argument objects) are encoded
//! into [`EncodedKey`]s whose byte-wise order is the order providers sort
//! node sequences by. Plain strings encode to their UTF-8 bytes so field
//! names keep lexical order; every other value is prefixed with `0x00` and
//! a shape tag so it sorts before all field names and decodes unambiguously.

use std::fmt;

use bytes::Bytes;
use serde_json::{Map, Number, Value};

use crate::error::{DecodeError, Result};
use crate::primitives::bytes::{buf::Cursor, ord};

pub mod args;
pub mod path;

pub use args::{
    decode_range, encode_filter, encode_range, split_args, Bounds, Filter, Range, RangeKey,
};
pub use path::{decode_path, encode_path, encode_segments, parse_path, split_ref, EncodedPath, SplitRef};

const TAGGED: u8 = 0x00;

const TOP_SCALAR: u8 = 0x01;
const TOP_TUPLE: u8 = 0x02;
const TOP_ARGS: u8 = 0x03;

const EL_END: u8 = 0x00;
const EL_NULL: u8 = 0x01;
const EL_FALSE: u8 = 0x02;
const EL_TRUE: u8 = 0x03;
const EL_NUMBER: u8 = 0x04;
const EL_STRING: u8 = 0x05;
const EL_ARRAY: u8 = 0x06;
const EL_OBJECT: u8 = 0x07;

/// Largest integer magnitude that survives the f64 element encoding.
const MAX_SAFE_INT: f64 = 9_007_199_254_740_991.0;

/// Totally ordered, immutable encoded key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EncodedKey(Bytes);

impl EncodedKey {
    /// The smallest key; also the key of a collection's default bucket.
    pub const MIN: EncodedKey = EncodedKey(Bytes::new());

    /// Sorts after every key [`encode_key`] can produce; closes open-ended gaps.
    pub const MAX: EncodedKey = EncodedKey(Bytes::from_static(&[0xFF]));

    /// Wraps raw encoded bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Encoded key for a plain field name.
    pub fn field(name: &str) -> Self {
        if name.as_bytes().first() == Some(&TAGGED) {
            let mut out = vec![TAGGED, TOP_SCALAR];
            put_element_str(&mut out, name);
            return Self(Bytes::from(out));
        }
        Self(Bytes::copy_from_slice(name.as_bytes()))
    }

    /// Raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for the empty (minimum) key.
    pub fn is_min(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) if self.0.first() != Some(&TAGGED) => write!(f, "{text:?}"),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Encodes a query key (field name, cursor, tuple, or argument object).
pub fn encode_key(value: &Value) -> Result<EncodedKey> {
    let mut out = Vec::new();
    match value {
        Value::String(s) => return Ok(EncodedKey::field(s)),
        Value::Array(items) => {
            out.extend_from_slice(&[TAGGED, TOP_TUPLE]);
            for item in items {
                put_element(&mut out, item)?;
            }
        }
        Value::Object(fields) => {
            out.extend_from_slice(&[TAGGED, TOP_ARGS]);
            put_fields(&mut out, fields)?;
        }
        scalar => {
            out.extend_from_slice(&[TAGGED, TOP_SCALAR]);
            put_element(&mut out, scalar)?;
        }
    }
    Ok(EncodedKey(Bytes::from(out)))
}

/// Encodes an array index as a key.
pub fn encode_index(index: usize) -> EncodedKey {
    let mut out = vec![TAGGED, TOP_SCALAR, EL_NUMBER];
    ord::put_f64_be(&mut out, index as f64);
    EncodedKey(Bytes::from(out))
}

/// Decodes a key produced by [`encode_key`].
pub fn decode_key(key: &EncodedKey) -> Result<Value> {
    let bytes = key.as_bytes();
    if bytes.first() != Some(&TAGGED) {
        return std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_owned()))
            .map_err(|_| DecodeError::invalid_key(format!("{key:?} is not valid UTF-8")));
    }
    let mut cur = Cursor::new(&bytes[1..]);
    let value = match cur.take(1).map(|b| b[0]) {
        Some(TOP_SCALAR) => take_element(&mut cur, key)?,
        Some(TOP_TUPLE) => {
            let mut items = Vec::new();
            while cur.remaining() > 0 {
                items.push(take_element(&mut cur, key)?);
            }
            Value::Array(items)
        }
        Some(TOP_ARGS) => {
            let fields = take_fields(&mut cur, key, false)?;
            Value::Object(fields)
        }
        _ => return Err(truncated(key)),
    };
    if cur.remaining() > 0 {
        return Err(DecodeError::invalid_key(format!(
            "{key:?} has {} trailing bytes",
            cur.remaining()
        )));
    }
    Ok(value)
}

fn put_element(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push(EL_NULL),
        Value::Bool(false) => out.push(EL_FALSE),
        Value::Bool(true) => out.push(EL_TRUE),
        Value::Number(n) => {
            let f = n
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| DecodeError::invalid_key(format!("number {n} is not encodable")))?;
            out.push(EL_NUMBER);
            ord::put_f64_be(out, f);
        }
        Value::String(s) => put_element_str(out, s),
        Value::Array(items) => {
            out.push(EL_ARRAY);
            for item in items {
                put_element(out, item)?;
            }
            out.push(EL_END);
        }
        Value::Object(fields) => {
            out.push(EL_OBJECT);
            put_fields(out, fields)?;
            out.push(EL_END);
        }
    }
    Ok(())
}

fn put_element_str(out: &mut Vec<u8>, s: &str) {
    out.push(EL_STRING);
    ord::put_escaped(out, s.as_bytes());
}

// Field names are written as escaped strings so argument objects compare
// name-by-name; serde_json maps iterate in sorted key order.
fn put_fields(out: &mut Vec<u8>, fields: &Map<String, Value>) -> Result<()> {
    for (name, value) in fields {
        ord::put_escaped(out, name.as_bytes());
        put_element(out, value)?;
    }
    Ok(())
}

fn take_element(cur: &mut Cursor<'_>, key: &EncodedKey) -> Result<Value> {
    let tag = cur.take(1).ok_or_else(|| truncated(key))?[0];
    let value = match tag {
        EL_NULL => Value::Null,
        EL_FALSE => Value::Bool(false),
        EL_TRUE => Value::Bool(true),
        EL_NUMBER => {
            let raw = cur.take(8).ok_or_else(|| truncated(key))?;
            let f = ord::get_f64_be(raw).ok_or_else(|| truncated(key))?;
            number_value(f)
        }
        EL_STRING => Value::String(take_str(cur, key)?),
        EL_ARRAY => {
            let mut items = Vec::new();
            loop {
                match cur.peek() {
                    Some(EL_END) => {
                        cur.skip(1);
                        break;
                    }
                    Some(_) => items.push(take_element(cur, key)?),
                    None => return Err(truncated(key)),
                }
            }
            Value::Array(items)
        }
        EL_OBJECT => Value::Object(take_fields(cur, key, true)?),
        other => {
            return Err(DecodeError::invalid_key(format!(
                "{key:?} has unknown element tag {other:#04x}"
            )))
        }
    };
    Ok(value)
}

fn take_str(cur: &mut Cursor<'_>, key: &EncodedKey) -> Result<String> {
    let (raw, used) = ord::split_escaped(cur.rest()).ok_or_else(|| truncated(key))?;
    cur.skip(used);
    String::from_utf8(raw)
        .map_err(|_| DecodeError::invalid_key(format!("{key:?} holds a non UTF-8 string")))
}

fn take_fields(cur: &mut Cursor<'_>, key: &EncodedKey, nested: bool) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    loop {
        match cur.peek() {
            None if !nested => break,
            None => return Err(truncated(key)),
            Some(EL_END) if nested => {
                cur.skip(1);
                break;
            }
            Some(_) => {
                let name = take_str(cur, key)?;
                let value = take_element(cur, key)?;
                fields.insert(name, value);
            }
        }
    }
    Ok(fields)
}

fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INT {
        return Value::Number(Number::from(f as i64));
    }
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn truncated(key: &EncodedKey) -> DecodeError {
    DecodeError::invalid_key(format!("{key:?} is truncated"))
}
