//! Provider-shaped JSON to node sequences and back.
//!
//! Objects become field-keyed sequences. Arrays become index-keyed
//! sequences unless their items carry `$key`, in which case each item is
//! keyed by its encoded `$key`. Item keys of the form
//! `{ "$cursor": c, ..filter }` place the item inside the prefix bucket of
//! `filter`; a key made only of `$since`/`$until` (or `$all`) is a gap.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::node::{validate_sequence, Node, NodeBody};
use crate::codec::{decode_key, decode_path, encode_filter, encode_index, encode_key, encode_path, EncodedKey, Filter};
use crate::error::{DecodeError, Result};

const GAP_FIELDS: [&str; 3] = ["$since", "$until", "$all"];

/// Encodes provider-shaped JSON into a sorted, validated node sequence.
pub fn encode_graph(value: &Value) -> Result<Vec<Node>> {
    match value {
        Value::Object(fields) => encode_object(fields),
        Value::Array(items) => encode_array(items),
        other => Err(DecodeError::invalid_graph(format!(
            "a graph must be an object or an array, got {other}"
        ))),
    }
}

fn encode_object(fields: &Map<String, Value>) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        if name.starts_with('$') {
            return Err(DecodeError::invalid_graph(format!(
                "unexpected field {name} in a collection"
            )));
        }
        nodes.push(encode_node(EncodedKey::field(name), value)?);
    }
    finish(nodes)
}

fn encode_node(key: EncodedKey, value: &Value) -> Result<Node> {
    let node = match value {
        Value::Null => Node::deleted(key),
        Value::Object(fields) if fields.contains_key("$ref") => {
            only_field(fields, "$ref")?;
            Node::link(key, encode_path(&fields["$ref"])?)
        }
        Value::Object(fields) if fields.contains_key("$val") => {
            only_field(fields, "$val")?;
            match &fields["$val"] {
                Value::Null => Node::deleted(key),
                opaque @ (Value::Object(_) | Value::Array(_)) => Node::val(key, opaque.clone()),
                scalar => Node::leaf(key, scalar.clone()),
            }
        }
        Value::Object(fields) => Node::branch(key, encode_object(fields)?),
        Value::Array(items) => Node::branch(key, encode_array(items)?),
        scalar => Node::leaf(key, scalar.clone()),
    };
    Ok(node)
}

fn only_field(fields: &Map<String, Value>, name: &str) -> Result<()> {
    if fields.len() == 1 {
        return Ok(());
    }
    Err(DecodeError::invalid_graph(format!(
        "{name} cannot be combined with other fields"
    )))
}

fn encode_array(items: &[Value]) -> Result<Vec<Node>> {
    let mut plain = Vec::new();
    let mut buckets: BTreeMap<EncodedKey, Vec<Node>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        let keyed = match item {
            Value::Object(fields) if fields.contains_key("$key") => fields,
            _ => {
                plain.push(encode_node(encode_index(index), item)?);
                continue;
            }
        };
        let (filter, node) = encode_item(keyed)?;
        match filter {
            Some(filter) => buckets.entry(encode_filter(&filter)?).or_default().push(node),
            None => plain.push(node),
        }
    }
    if buckets.is_empty() {
        return finish(plain);
    }
    let mut nodes = Vec::with_capacity(buckets.len() + 1);
    if !plain.is_empty() {
        nodes.push(Node::prefix(EncodedKey::MIN, finish(plain)?));
    }
    for (key, children) in buckets {
        nodes.push(Node::prefix(key, finish(children)?));
    }
    finish(nodes)
}

fn encode_item(fields: &Map<String, Value>) -> Result<(Option<Filter>, Node)> {
    let mut rest = fields.clone();
    let raw_key = rest.remove("$key").unwrap_or(Value::Null);

    let (key, filter) = match raw_key {
        Value::Object(mut args) => {
            if let Some(cursor) = args.remove("$cursor") {
                (encode_key(&cursor)?, filter_of(args)?)
            } else if args.keys().any(|name| GAP_FIELDS.contains(&name.as_str())) {
                return encode_gap(args, &rest);
            } else {
                (encode_key(&Value::Object(args))?, None)
            }
        }
        other => (encode_key(&other)?, None),
    };

    let value = match rest.remove("$chi") {
        Some(children) if rest.is_empty() => children,
        Some(_) => {
            return Err(DecodeError::invalid_graph(
                "$chi cannot be combined with other fields",
            ))
        }
        None if rest.is_empty() => {
            return Err(DecodeError::invalid_graph(format!(
                "item {key:?} carries no value"
            )))
        }
        None => Value::Object(rest),
    };
    Ok((filter, encode_node(key, &value)?))
}

fn encode_gap(args: Map<String, Value>, rest: &Map<String, Value>) -> Result<(Option<Filter>, Node)> {
    if !rest.is_empty() {
        return Err(DecodeError::invalid_graph(
            "gap items cannot carry a value",
        ));
    }
    let mut start = EncodedKey::MIN;
    let mut end = EncodedKey::MAX;
    let mut filter = Map::new();
    for (name, field) in args {
        match name.as_str() {
            "$since" => start = encode_key(&field)?,
            "$until" => end = encode_key(&field)?,
            "$all" if field == Value::Bool(true) => {}
            other if other.starts_with('$') => {
                return Err(DecodeError::invalid_graph(format!(
                    "gap items take $since, $until or $all, not {other}"
                )))
            }
            _ => {
                filter.insert(name, field);
            }
        }
    }
    Ok((filter_of(filter)?, Node::range(start, end)))
}

fn filter_of(args: Map<String, Value>) -> Result<Option<Filter>> {
    if let Some(name) = args.keys().find(|name| name.starts_with('$')) {
        return Err(DecodeError::invalid_graph(format!(
            "unexpected key field {name}"
        )));
    }
    Ok((!args.is_empty()).then(|| args.into_iter().collect()))
}

fn finish(mut nodes: Vec<Node>) -> Result<Vec<Node>> {
    nodes.sort_by(|a, b| a.key.cmp(&b.key));
    validate_sequence(&nodes)?;
    Ok(nodes)
}

/// Materializes a node sequence back into provider-shaped JSON.
///
/// Field-keyed sequences become objects and densely index-keyed ones plain
/// arrays; anything else becomes an array of `$key`ed items.
pub fn decode_graph(nodes: &[Node]) -> Result<Value> {
    if let Some(fields) = as_fields(nodes)? {
        return Ok(Value::Object(fields));
    }
    if is_dense(nodes) {
        let items = nodes.iter().map(decode_body).collect::<Result<_>>()?;
        return Ok(Value::Array(items));
    }
    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.prefix {
            let NodeBody::Branch(children) = &node.body else {
                continue;
            };
            let filter = match decode_key(&node.key)? {
                Value::Object(filter) => Some(filter),
                _ => None,
            };
            for child in children {
                items.push(decode_item(child, filter.as_ref())?);
            }
        } else {
            items.push(decode_item(node, None)?);
        }
    }
    Ok(Value::Array(items))
}

fn as_fields(nodes: &[Node]) -> Result<Option<Map<String, Value>>> {
    let mut fields = Map::new();
    for node in nodes {
        let point = !node.is_range() || node.end_key() == &node.key;
        if node.prefix || !point || node.key.is_min() {
            return Ok(None);
        }
        let Value::String(name) = decode_key(&node.key)? else {
            return Ok(None);
        };
        fields.insert(name, decode_body(node)?);
    }
    Ok(Some(fields))
}

fn is_dense(nodes: &[Node]) -> bool {
    nodes
        .iter()
        .enumerate()
        .all(|(i, node)| !node.prefix && !node.is_range() && node.key == encode_index(i))
}

fn decode_body(node: &Node) -> Result<Value> {
    let value = match &node.body {
        NodeBody::Leaf {
            value: value @ (Value::Object(_) | Value::Array(_)),
            is_val: true,
        } => single("$val", value.clone()),
        NodeBody::Leaf { value, .. } => value.clone(),
        NodeBody::Branch(children) => decode_graph(children)?,
        NodeBody::Link(path) => single("$ref", Value::Array(decode_path(path)?)),
        NodeBody::Range { .. } => Value::Null,
    };
    Ok(value)
}

fn decode_item(node: &Node, filter: Option<&Map<String, Value>>) -> Result<Value> {
    let mut item = Map::new();
    if let NodeBody::Range { end } = &node.body {
        if end != &node.key {
            let mut gap = filter.cloned().unwrap_or_default();
            if !node.key.is_min() {
                gap.insert("$since".into(), decode_key(&node.key)?);
            }
            if end != &EncodedKey::MAX {
                gap.insert("$until".into(), decode_key(end)?);
            }
            if gap.is_empty() {
                gap.insert("$all".into(), Value::Bool(true));
            }
            item.insert("$key".into(), Value::Object(gap));
            return Ok(Value::Object(item));
        }
    }

    let key = decode_key(&node.key)?;
    let key = match filter {
        Some(filter) => {
            let mut args = filter.clone();
            args.insert("$cursor".into(), key);
            Value::Object(args)
        }
        None => key,
    };
    item.insert("$key".into(), key);
    match (&node.body, decode_body(node)?) {
        (NodeBody::Branch(_), Value::Object(fields)) => item.extend(fields),
        (NodeBody::Branch(_), children) => {
            item.insert("$chi".into(), children);
        }
        (NodeBody::Link(_), Value::Object(link)) => item.extend(link),
        (NodeBody::Leaf { is_val: true, .. }, Value::Object(val)) if val.contains_key("$val") => {
            item.extend(val)
        }
        (_, value) => {
            item.insert("$val".into(), value);
        }
    }
    Ok(Value::Object(item))
}

fn single(name: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_owned(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_sort_by_field() {
        let nodes = encode_graph(&json!({"b": 1, "a": {"c": true}})).unwrap();
        assert_eq!(nodes[0].key, EncodedKey::field("a"));
        assert!(matches!(nodes[0].body, NodeBody::Branch(_)));
        assert_eq!(nodes[1].body, NodeBody::Leaf { value: json!(1), is_val: false });
    }

    #[test]
    fn references_values_and_deletions() {
        let nodes = encode_graph(&json!({
            "author": {"$ref": "users.orwell"},
            "tags": {"$val": ["a", "b"]},
            "gone": null,
        }))
        .unwrap();
        assert!(matches!(&nodes[0].body, NodeBody::Link(path) if path.len() == 2));
        assert!(nodes[1].covers(&EncodedKey::field("gone")));
        assert_eq!(nodes[2].body, NodeBody::Leaf { value: json!(["a", "b"]), is_val: true });
        assert!(encode_graph(&json!({"x": {"$ref": "a", "y": 1}})).is_err());
    }

    #[test]
    fn keyed_items_and_gaps() {
        let nodes = encode_graph(&json!([
            {"$key": ["2001"], "title": "2001"},
            {"$key": ["1984"], "title": "1984"},
            {"$key": {"$since": ["2002"]}},
        ]))
        .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].key, encode_key(&json!(["1984"])).unwrap());
        assert_eq!(nodes[2].end_key(), &EncodedKey::MAX);
        assert!(encode_graph(&json!([{"$key": ["a"]}])).is_err());
    }

    #[test]
    fn filtered_items_live_in_prefix_buckets() {
        let nodes = encode_graph(&json!([
            {"$key": {"$cursor": [1], "bar": "x"}, "id": 1},
            {"$key": {"$cursor": [2], "bar": "x"}, "id": 2},
            {"$key": ["plain"], "id": 3},
        ]))
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.prefix));
        assert!(nodes[0].key.is_min());
        assert!(matches!(&nodes[1].body, NodeBody::Branch(children) if children.len() == 2));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = encode_graph(&json!([{"$key": 1, "a": 1}, {"$key": 1, "a": 2}])).unwrap_err();
        assert_eq!(err.code(), "InvalidGraph");
    }

    #[test]
    fn decode_restores_porcelain() {
        for graph in [
            json!({"a": 1, "b": {"c": [1, 2]}, "d": {"$ref": ["x", "y"]}, "e": {"$val": {"k": 1}}}),
            json!([
                {"$key": ["1984"], "title": "1984"},
                {"$key": {"$since": ["1985"], "$until": ["2000"]}},
                {"$key": ["2001"], "$val": null},
            ]),
            json!([
                {"$key": {"$cursor": [1], "bar": "x"}, "id": 1},
                {"$key": {"$cursor": [2], "bar": "x"}, "$ref": ["ids", 2]},
            ]),
        ] {
            let nodes = encode_graph(&graph).unwrap();
            assert_eq!(decode_graph(&nodes).unwrap(), graph);
        }
    }
}
