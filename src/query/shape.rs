//! Encoded query tree to the nested shape providers are invoked with.

use serde_json::{Map, Value};

use super::encode::QueryNode;
use crate::codec::{decode_key, decode_range, Bounds};
use crate::error::Result;

/// Renders an encoded query as provider-facing JSON.
///
/// A level holding only field keys renders as an object of selections.
/// A level holding a range or any non-field key renders as a flat array of
/// `key, selection` pairs, where a range's key is its bounds object.
pub fn decorate_query(nodes: &[QueryNode]) -> Result<Value> {
    let mut names = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node.key().map(decode_key).transpose()? {
            Some(Value::String(name)) => names.push(name),
            _ => return decorate_page(nodes),
        }
    }
    let mut fields = Map::new();
    for (name, node) in names.into_iter().zip(nodes) {
        fields.insert(name, selection(node)?);
    }
    Ok(Value::Object(fields))
}

fn decorate_page(nodes: &[QueryNode]) -> Result<Value> {
    let mut pairs = Vec::with_capacity(nodes.len() * 2);
    for node in nodes {
        let key = match node {
            QueryNode::Leaf { key } | QueryNode::Branch { key, .. } => decode_key(key)?,
            QueryNode::Range { filter, range, .. } => Bounds {
                filter: filter.clone().unwrap_or_default(),
                range: decode_range(range)?,
            }
            .to_json(),
        };
        pairs.push(key);
        pairs.push(selection(node)?);
    }
    Ok(Value::Array(pairs))
}

fn selection(node: &QueryNode) -> Result<Value> {
    match node {
        QueryNode::Branch { children, .. }
        | QueryNode::Range {
            children: Some(children),
            ..
        } => decorate_query(children),
        _ => Ok(Value::Bool(true)),
    }
}
