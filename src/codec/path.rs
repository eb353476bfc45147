//! Reference paths.

use serde_json::Value;
use smallvec::SmallVec;

use super::args::{split_args, Filter, Range};
use super::{decode_key, encode_key, EncodedKey};
use crate::error::{DecodeError, Result};

/// Encoded path segments; most references are only a few levels deep.
pub type EncodedPath = SmallVec<[EncodedKey; 4]>;

/// Parses a reference into decoded path segments.
///
/// A string is split on `.` (`"users.orwell"`); an array is taken as-is.
pub fn parse_path(reference: &Value) -> Result<Vec<Value>> {
    let segments: Vec<Value> = match reference {
        Value::String(dotted) => dotted
            .split('.')
            .map(|s| Value::String(s.to_owned()))
            .collect(),
        Value::Array(items) => items.clone(),
        other => {
            return Err(DecodeError::invalid_key(format!(
                "reference must be a string or array, got {other}"
            )))
        }
    };
    if segments.is_empty() || segments.iter().any(|s| s.as_str() == Some("")) {
        return Err(DecodeError::invalid_key(format!(
            "reference {reference} has an empty segment"
        )));
    }
    Ok(segments)
}

/// Encodes already-parsed path segments.
pub fn encode_segments(segments: &[Value]) -> Result<EncodedPath> {
    segments.iter().map(encode_key).collect()
}

/// Parses and encodes a reference that must not carry range arguments.
pub fn encode_path(reference: &Value) -> Result<EncodedPath> {
    let split = split_ref(reference)?;
    if split.range.is_some() {
        return Err(DecodeError::invalid_key(format!(
            "reference {reference} ends in a range; use split_ref"
        )));
    }
    encode_segments(&split.path)
}

/// Decodes an encoded path back into segments.
pub fn decode_path(path: &[EncodedKey]) -> Result<Vec<Value>> {
    path.iter().map(decode_key).collect()
}

/// A reference split into its target path and optional trailing range.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitRef {
    /// Segments to look up; a trailing filter is kept as an argument-object segment.
    pub path: Vec<Value>,
    /// Range applied to the target collection.
    pub range: Option<Range>,
    /// Equality filters of the trailing segment.
    pub filter: Option<Filter>,
}

/// Splits the range off a reference whose last segment is pagination arguments.
pub fn split_ref(reference: &Value) -> Result<SplitRef> {
    let mut path = parse_path(reference)?;
    let (range, filter) = match path.last() {
        Some(last @ Value::Object(_)) => split_args(last)?,
        _ => (None, None),
    };
    if range.is_some() {
        path.pop();
        if let Some(filter) = &filter {
            path.push(Value::Object(filter.clone().into_iter().collect()));
        }
        if path.is_empty() {
            return Err(DecodeError::invalid_key(format!(
                "reference {reference} has no target before its range"
            )));
        }
    }
    Ok(SplitRef {
        path,
        range,
        filter,
    })
}
