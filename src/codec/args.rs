//! Pagination arguments: splitting, validation, and range encoding.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{encode_key, decode_key, EncodedKey};
use crate::error::{DecodeError, Result};

/// Equality-filter fields of an argument object, sorted by name.
pub type Filter = BTreeMap<String, Value>;

const RANGE_FIELDS: [&str; 7] = [
    "$first", "$last", "$all", "$since", "$after", "$before", "$until",
];

/// Cursor range and page size of a pagination spec.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Range {
    /// Forward page size.
    #[serde(rename = "$first", skip_serializing_if = "Option::is_none")]
    pub first: Option<usize>,
    /// Backward page size.
    #[serde(rename = "$last", skip_serializing_if = "Option::is_none")]
    pub last: Option<usize>,
    /// Inclusive lower cursor.
    #[serde(rename = "$since", skip_serializing_if = "Option::is_none")]
    pub since: Option<Value>,
    /// Exclusive lower cursor.
    #[serde(rename = "$after", skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    /// Exclusive upper cursor.
    #[serde(rename = "$before", skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// Inclusive upper cursor.
    #[serde(rename = "$until", skip_serializing_if = "Option::is_none")]
    pub until: Option<Value>,
    /// The whole window between the cursors, with no page size.
    #[serde(rename = "$all", skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

impl Range {
    /// Page size requested in either direction.
    pub fn count(&self) -> Option<usize> {
        self.first.or(self.last)
    }

    /// Rejects contradictory or incomplete bounds.
    pub fn validate(&self) -> Result<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(DecodeError::invalid_bounds("$first and $last are exclusive"));
        }
        if self.all && self.count().is_some() {
            return Err(DecodeError::invalid_bounds("$all excludes $first and $last"));
        }
        if !self.all && self.count().is_none() {
            return Err(DecodeError::invalid_bounds(
                "one of $first, $last or $all is required",
            ));
        }
        if self.since.is_some() && self.after.is_some() {
            return Err(DecodeError::invalid_bounds("$since and $after are exclusive"));
        }
        if self.before.is_some() && self.until.is_some() {
            return Err(DecodeError::invalid_bounds("$before and $until are exclusive"));
        }
        Ok(())
    }
}

/// A pagination spec: equality filters plus a cursor range.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Bounds {
    /// Equality filters selecting a sub-collection.
    #[serde(flatten)]
    pub filter: Filter,
    /// Cursor range within that sub-collection.
    #[serde(flatten)]
    pub range: Range,
}

impl Bounds {
    /// Parses and validates a pagination argument object.
    pub fn parse(value: &Value) -> Result<Self> {
        match split_args(value)? {
            (Some(range), filter) => Ok(Self {
                filter: filter.unwrap_or_default(),
                range,
            }),
            (None, _) => Err(DecodeError::invalid_bounds(format!(
                "{value} has no range fields"
            ))),
        }
    }

    /// Renders the bounds as a porcelain argument object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Splits an argument object into its range and its equality filters.
///
/// Non-object keys have neither. The range, when present, is validated.
pub fn split_args(value: &Value) -> Result<(Option<Range>, Option<Filter>)> {
    let Value::Object(fields) = value else {
        return Ok((None, None));
    };
    let mut range = Range::default();
    let mut has_range = false;
    let mut filter = Filter::new();
    for (name, field) in fields {
        if RANGE_FIELDS.contains(&name.as_str()) {
            has_range = true;
            set_range_field(&mut range, name, field)?;
        } else if name.starts_with('$') {
            return Err(DecodeError::invalid_bounds(format!(
                "unknown argument field {name}"
            )));
        } else {
            filter.insert(name.clone(), field.clone());
        }
    }
    if has_range {
        range.validate()?;
    }
    let range = has_range.then_some(range);
    let filter = (!filter.is_empty()).then_some(filter);
    Ok((range, filter))
}

fn set_range_field(range: &mut Range, name: &str, field: &Value) -> Result<()> {
    let count = || {
        field
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| DecodeError::invalid_bounds(format!("{name} must be a count")))
    };
    match name {
        "$first" => range.first = Some(count()?),
        "$last" => range.last = Some(count()?),
        "$all" => {
            range.all = field
                .as_bool()
                .ok_or_else(|| DecodeError::invalid_bounds("$all must be a boolean"))?
        }
        "$since" => range.since = Some(field.clone()),
        "$after" => range.after = Some(field.clone()),
        "$before" => range.before = Some(field.clone()),
        "$until" => range.until = Some(field.clone()),
        _ => {}
    }
    Ok(())
}

/// Encodes filter fields as the key of their prefix sub-collection.
pub fn encode_filter(filter: &Filter) -> Result<EncodedKey> {
    let fields: Map<String, Value> = filter.clone().into_iter().collect();
    encode_key(&Value::Object(fields))
}

/// Encoded form of a [`Range`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeKey {
    /// Lower cursor bound.
    pub lower: Bound<EncodedKey>,
    /// Upper cursor bound.
    pub upper: Bound<EncodedKey>,
    /// Maximum number of data nodes; `None` is unbounded.
    pub limit: Option<usize>,
    /// Scan from the upper bound downwards (`$last`).
    pub backward: bool,
}

impl RangeKey {
    /// True when `key` lies above the lower bound.
    pub fn above_lower(&self, key: &EncodedKey) -> bool {
        match &self.lower {
            Bound::Included(lo) => key >= lo,
            Bound::Excluded(lo) => key > lo,
            Bound::Unbounded => true,
        }
    }

    /// True when `key` lies below the upper bound.
    pub fn below_upper(&self, key: &EncodedKey) -> bool {
        match &self.upper {
            Bound::Included(hi) => key <= hi,
            Bound::Excluded(hi) => key < hi,
            Bound::Unbounded => true,
        }
    }

    /// True when no key can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi))
            | (Bound::Excluded(lo), Bound::Included(hi))
            | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
            _ => false,
        }
    }

    /// True when both bounds pin the same key.
    pub fn is_point(&self) -> bool {
        matches!((&self.lower, &self.upper), (Bound::Included(lo), Bound::Included(hi)) if lo == hi)
    }
}

/// Encodes a validated range into key bounds.
pub fn encode_range(range: &Range) -> Result<RangeKey> {
    let lower = match (&range.since, &range.after) {
        (Some(since), _) => Bound::Included(encode_key(since)?),
        (None, Some(after)) => Bound::Excluded(encode_key(after)?),
        (None, None) => Bound::Unbounded,
    };
    let upper = match (&range.until, &range.before) {
        (Some(until), _) => Bound::Included(encode_key(until)?),
        (None, Some(before)) => Bound::Excluded(encode_key(before)?),
        (None, None) => Bound::Unbounded,
    };
    Ok(RangeKey {
        lower,
        upper,
        limit: range.count(),
        backward: range.last.is_some(),
    })
}

/// Decodes key bounds back into a porcelain range.
pub fn decode_range(key: &RangeKey) -> Result<Range> {
    let mut range = Range::default();
    match &key.lower {
        Bound::Included(k) => range.since = Some(decode_key(k)?),
        Bound::Excluded(k) => range.after = Some(decode_key(k)?),
        Bound::Unbounded => {}
    }
    match &key.upper {
        Bound::Included(k) => range.until = Some(decode_key(k)?),
        Bound::Excluded(k) => range.before = Some(decode_key(k)?),
        Bound::Unbounded => {}
    }
    match (key.limit, key.backward) {
        (Some(n), true) => range.last = Some(n),
        (Some(n), false) => range.first = Some(n),
        (None, _) => range.all = true,
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_separates_filters() {
        let (range, filter) = split_args(&json!({"$first": 2, "bar": "something"})).unwrap();
        assert_eq!(range.unwrap().first, Some(2));
        assert_eq!(filter.unwrap().get("bar"), Some(&json!("something")));
    }

    #[test]
    fn plain_argument_objects_have_no_range() {
        let (range, filter) = split_args(&json!({"id": 7})).unwrap();
        assert!(range.is_none());
        assert!(filter.is_some());
        assert_eq!(split_args(&json!("x")).unwrap(), (None, None));
    }

    #[test]
    fn contradictory_bounds_are_rejected() {
        for bad in [
            json!({"$first": 1, "$last": 1}),
            json!({"$first": 1, "$since": 1, "$after": 2}),
            json!({"$last": 1, "$before": 1, "$until": 2}),
            json!({"$since": 1}),
            json!({"$all": true, "$first": 3}),
            json!({"$first": -1}),
            json!({"$first": 1, "$cursor": 2}),
        ] {
            let err = split_args(&bad).unwrap_err();
            assert_eq!(err.code(), "InvalidBounds", "{bad}");
        }
    }

    #[test]
    fn bounds_serialize_with_dollar_fields() {
        let bounds = Bounds::parse(&json!({"$first": 2, "$after": ["1984"], "tag": "x"})).unwrap();
        assert_eq!(
            bounds.to_json(),
            json!({"$first": 2, "$after": ["1984"], "tag": "x"})
        );
    }

    #[test]
    fn range_key_roundtrip() {
        let (range, _) = split_args(&json!({"$last": 3, "$before": ["b"], "$since": ["a"]})).unwrap();
        let range = range.unwrap();
        let key = encode_range(&range).unwrap();
        assert!(key.backward);
        assert!(matches!(key.upper, Bound::Excluded(_)));
        assert_eq!(decode_range(&key).unwrap(), range);
    }

    #[test]
    fn point_and_empty_ranges() {
        let (range, _) = split_args(&json!({"$all": true, "$since": 5, "$until": 5})).unwrap();
        let key = encode_range(&range.unwrap()).unwrap();
        assert!(key.is_point());
        assert!(!key.is_empty());
        let (range, _) = split_args(&json!({"$all": true, "$after": 5, "$until": 5})).unwrap();
        assert!(encode_range(&range.unwrap()).unwrap().is_empty());
    }
}
