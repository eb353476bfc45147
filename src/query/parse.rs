//! Porcelain JSON to [`Query`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::ast::{Item, Query, RefQuery};
use crate::codec::{parse_path, split_args, split_ref, Bounds};
use crate::error::{DecodeError, Result};

impl Query {
    /// Parses a porcelain query.
    ///
    /// `true` and non-zero numbers select a whole value, objects select
    /// fields, arrays select items. An object carrying `$key` is a
    /// one-item array; an object carrying `$ref` is a reference query.
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(Self::Leaf),
            Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Ok(Self::Leaf),
            Value::Object(fields) if fields.contains_key("$ref") => parse_reference(fields),
            Value::Object(fields) if fields.contains_key("$key") => {
                Ok(Self::Items(vec![parse_item(fields)?]))
            }
            Value::Object(fields) => Ok(Self::Fields(parse_fields(fields)?)),
            Value::Array(items) => parse_items(items),
            other => Err(DecodeError::invalid_query(format!(
                "{other} does not select anything"
            ))),
        }
    }
}

fn parse_fields(fields: &Map<String, Value>) -> Result<BTreeMap<String, Query>> {
    fields
        .iter()
        .map(|(name, sub)| {
            if name.starts_with('$') {
                return Err(DecodeError::invalid_query(format!(
                    "unexpected field {name}"
                )));
            }
            Ok((name.clone(), Query::parse(sub)?))
        })
        .collect()
}

fn parse_items(items: &[Value]) -> Result<Query> {
    let mut parsed = Vec::with_capacity(items.len());
    let mut page: Option<&Bounds> = None;
    for (index, item) in items.iter().enumerate() {
        let item = match item {
            Value::Object(fields) if fields.contains_key("$key") => parse_item(fields)?,
            other => Item::Index {
                index,
                query: Query::parse(other)?,
            },
        };
        parsed.push(item);
    }
    for item in &parsed {
        if let Item::Page { bounds, .. } = item {
            if let Some(first) = page {
                return Err(DecodeError::MultipleRangeQueries {
                    first: first.to_json(),
                    second: bounds.to_json(),
                });
            }
            page = Some(bounds);
        }
    }
    Ok(Query::Items(parsed))
}

fn parse_item(fields: &Map<String, Value>) -> Result<Item> {
    let mut rest = fields.clone();
    let key = rest.remove("$key").unwrap_or(Value::Null);
    let query = match rest.remove("$chi") {
        Some(chi) if rest.is_empty() => Query::parse(&chi)?,
        Some(_) => {
            return Err(DecodeError::invalid_query(
                "$chi cannot be combined with field selections",
            ))
        }
        None => sub_query(&rest)?,
    };

    let Value::Object(args) = &key else {
        return Ok(Item::Key { key, query });
    };
    if args.contains_key("$cursor") {
        let mut filter = args.clone();
        filter.remove("$cursor");
        if split_args(&Value::Object(filter))?.0.is_some() {
            return Err(DecodeError::invalid_query(format!(
                "{key} mixes a cursor with a range"
            )));
        }
        return Ok(Item::Key { key, query });
    }
    match split_args(&key)? {
        (Some(range), filter) => Ok(Item::Page {
            bounds: Bounds {
                filter: filter.unwrap_or_default(),
                range,
            },
            query,
        }),
        (None, _) => Ok(Item::Key { key, query }),
    }
}

fn parse_reference(fields: &Map<String, Value>) -> Result<Query> {
    let mut rest = fields.clone();
    let raw = rest.remove("$ref").unwrap_or(Value::Null);
    let reference = parse_path(&raw)?;
    let target = split_ref(&raw)?;
    let query = match &target.range {
        Some(range) => Query::page(
            Bounds {
                filter: Default::default(),
                range: range.clone(),
            },
            sub_query(&rest)?,
        ),
        None => Query::Fields(parse_fields(&rest)?),
    };
    Ok(Query::Reference(Box::new(RefQuery {
        reference,
        target,
        query,
    })))
}

fn sub_query(rest: &Map<String, Value>) -> Result<Query> {
    if rest.is_empty() {
        Ok(Query::Leaf)
    } else {
        Ok(Query::Fields(parse_fields(rest)?))
    }
}
