//! Query tree to the provider-facing node tree.
//!
//! References are hoisted: the field holding the link is fetched as a leaf
//! and the selection made through the link is re-rooted at the link target,
//! then merged with whatever else the query selects there.

use serde_json::Value;

use super::ast::{Item, Query, RefQuery};
use crate::codec::{
    encode_index, encode_key, encode_range, encode_segments, EncodedKey, Filter,
    RangeKey,
};
use crate::error::{DecodeError, Result};

/// One node of an encoded query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryNode {
    /// Fetch the whole value at `key`.
    Leaf {
        /// Encoded key.
        key: EncodedKey,
    },
    /// Fetch a selection beneath `key`.
    Branch {
        /// Encoded key.
        key: EncodedKey,
        /// Nested selection, sorted.
        children: Vec<QueryNode>,
    },
    /// Fetch a window of the collection.
    Range {
        /// Equality filters choosing the sub-collection.
        filter: Option<Filter>,
        /// Cursor bounds, page size and direction.
        range: RangeKey,
        /// Selection applied to each item; `None` fetches items whole.
        children: Option<Vec<QueryNode>>,
    },
}

impl QueryNode {
    /// Key of a point node; `None` for ranges.
    pub fn key(&self) -> Option<&EncodedKey> {
        match self {
            Self::Leaf { key } | Self::Branch { key, .. } => Some(key),
            Self::Range { .. } => None,
        }
    }

    fn same_target(&self, other: &QueryNode) -> bool {
        match (self, other) {
            (
                Self::Range { filter, range, .. },
                Self::Range {
                    filter: other_filter,
                    range: other_range,
                    ..
                },
            ) => filter == other_filter && range == other_range,
            (Self::Range { .. }, _) | (_, Self::Range { .. }) => false,
            _ => self.key() == other.key(),
        }
    }
}

/// Encodes `query` into a sorted root-level node tree.
pub fn encode_query(query: &Query) -> Result<Vec<QueryNode>> {
    if query.is_leaf() {
        return Err(DecodeError::invalid_query(
            "a query root must select fields or items",
        ));
    }
    let mut hoisted = Vec::new();
    let mut roots = encode_children(query, &mut hoisted)?;
    roots.extend(hoisted);
    Ok(merge(roots))
}

fn encode_children(query: &Query, hoisted: &mut Vec<QueryNode>) -> Result<Vec<QueryNode>> {
    let nodes = match query {
        Query::Leaf => Vec::new(),
        Query::Fields(fields) => fields
            .iter()
            .map(|(name, sub)| encode_node(EncodedKey::field(name), sub, hoisted))
            .collect::<Result<_>>()?,
        Query::Items(items) => items
            .iter()
            .map(|item| encode_item(item, hoisted))
            .collect::<Result<_>>()?,
        Query::Reference(reference) => {
            hoist(reference, hoisted)?;
            Vec::new()
        }
    };
    Ok(merge(nodes))
}

fn encode_item(item: &Item, hoisted: &mut Vec<QueryNode>) -> Result<QueryNode> {
    match item {
        Item::Index { index, query } => encode_node(encode_index(*index), query, hoisted),
        Item::Key {
            key: Value::Object(args),
            query,
        } if args.contains_key("$cursor") => {
            let mut filter = args.clone();
            let cursor = filter.remove("$cursor").unwrap_or(Value::Null);
            let inner = encode_node(encode_key(&cursor)?, query, hoisted)?;
            Ok(QueryNode::Branch {
                key: encode_key(&Value::Object(filter))?,
                children: vec![inner],
            })
        }
        Item::Key { key, query } => encode_node(encode_key(key)?, query, hoisted),
        Item::Page { bounds, query } => Ok(QueryNode::Range {
            filter: (!bounds.filter.is_empty()).then(|| bounds.filter.clone()),
            range: encode_range(&bounds.range)?,
            children: match query {
                Query::Leaf => None,
                other => Some(encode_children(other, hoisted)?),
            },
        }),
    }
}

fn encode_node(key: EncodedKey, query: &Query, hoisted: &mut Vec<QueryNode>) -> Result<QueryNode> {
    match query {
        Query::Leaf => Ok(QueryNode::Leaf { key }),
        Query::Reference(reference) => {
            hoist(reference, hoisted)?;
            Ok(QueryNode::Leaf { key })
        }
        other => Ok(QueryNode::Branch {
            key,
            children: encode_children(other, hoisted)?,
        }),
    }
}

fn hoist(reference: &RefQuery, hoisted: &mut Vec<QueryNode>) -> Result<()> {
    let path = encode_segments(&reference.target.path)?;
    let children = encode_children(&reference.query, hoisted)?;
    let mut node = None;
    for key in path.into_iter().rev() {
        node = Some(match node.take() {
            None if children.is_empty() => QueryNode::Leaf { key },
            None => QueryNode::Branch {
                key,
                children: children.clone(),
            },
            Some(inner) => QueryNode::Branch {
                key,
                children: vec![inner],
            },
        });
    }
    hoisted.extend(node);
    Ok(())
}

/// Combines nodes selecting the same target and sorts the result.
///
/// A leaf subsumes a branch on the same key; branches and identical
/// ranges merge their children.
pub fn merge(nodes: Vec<QueryNode>) -> Vec<QueryNode> {
    let mut merged: Vec<QueryNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match merged.iter_mut().find(|have| have.same_target(&node)) {
            Some(have) => absorb(have, node),
            None => merged.push(node),
        }
    }
    // Ranges (keyless) sort first.
    merged.sort_by(|a, b| a.key().cmp(&b.key()));
    merged
}

fn absorb(have: &mut QueryNode, node: QueryNode) {
    match (have, node) {
        (QueryNode::Leaf { .. }, _) => {}
        (have, leaf @ QueryNode::Leaf { .. }) => *have = leaf,
        (QueryNode::Branch { children, .. }, QueryNode::Branch { children: more, .. }) => {
            let mut all = std::mem::take(children);
            all.extend(more);
            *children = merge(all);
        }
        (QueryNode::Range { children, .. }, QueryNode::Range { children: more, .. }) => {
            *children = match (children.take(), more) {
                (Some(mut all), Some(more)) => {
                    all.extend(more);
                    Some(merge(all))
                }
                _ => None,
            };
        }
        _ => {}
    }
}
