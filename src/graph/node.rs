//! Nodes of a sorted node sequence.

use serde_json::Value;

use crate::codec::{EncodedKey, EncodedPath};
use crate::error::{DecodeError, Result};

/// Payload carried by a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum NodeBody {
    /// Literal value; `is_val` marks an object/array that is opaque.
    Leaf {
        /// The literal.
        value: Value,
        /// True when the value is a `$val` literal rather than a collection.
        is_val: bool,
    },
    /// A nested sequence.
    Branch(Vec<Node>),
    /// Reference to another path of the same snapshot.
    Link(EncodedPath),
    /// Confirmed gap: no data exists for keys in `[key, end]`.
    Range {
        /// Inclusive upper end of the gap.
        end: EncodedKey,
    },
}

/// One entry of a node sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Sort key.
    pub key: EncodedKey,
    /// Payload.
    pub body: NodeBody,
    /// Heads a filtered sub-collection reached by descending into an equality key.
    pub prefix: bool,
}

impl Node {
    /// Scalar (or plain JSON) leaf.
    pub fn leaf(key: EncodedKey, value: Value) -> Self {
        Self::with_body(key, NodeBody::Leaf { value, is_val: false })
    }

    /// Opaque `$val` leaf.
    pub fn val(key: EncodedKey, value: Value) -> Self {
        Self::with_body(key, NodeBody::Leaf { value, is_val: true })
    }

    /// Nested sequence.
    pub fn branch(key: EncodedKey, children: Vec<Node>) -> Self {
        Self::with_body(key, NodeBody::Branch(children))
    }

    /// Filtered sub-collection.
    pub fn prefix(key: EncodedKey, children: Vec<Node>) -> Self {
        Self {
            prefix: true,
            ..Self::branch(key, children)
        }
    }

    /// Reference to `path`.
    pub fn link(key: EncodedKey, path: EncodedPath) -> Self {
        Self::with_body(key, NodeBody::Link(path))
    }

    /// Confirmed gap covering `[key, end]`.
    pub fn range(key: EncodedKey, end: EncodedKey) -> Self {
        Self::with_body(key, NodeBody::Range { end })
    }

    /// Confirmed deletion of exactly `key`.
    pub fn deleted(key: EncodedKey) -> Self {
        Self::range(key.clone(), key)
    }

    fn with_body(key: EncodedKey, body: NodeBody) -> Self {
        Self {
            key,
            body,
            prefix: false,
        }
    }

    /// True for gap sentinels.
    pub fn is_range(&self) -> bool {
        matches!(self.body, NodeBody::Range { .. })
    }

    /// Largest key this node accounts for.
    pub fn end_key(&self) -> &EncodedKey {
        match &self.body {
            NodeBody::Range { end } => end,
            _ => &self.key,
        }
    }

    /// True when this node is a gap whose interval contains `key`.
    pub fn covers(&self, key: &EncodedKey) -> bool {
        self.is_range() && &self.key <= key && key <= self.end_key()
    }
}

/// Index of the first node at or after `key`.
///
/// A range node whose interval contains `key` is returned in preference to
/// the node after it, so callers can tell confirmed gaps from unknown keys.
pub fn find_first(nodes: &[Node], key: &EncodedKey) -> usize {
    let ix = nodes.partition_point(|node| &node.key < key);
    match ix.checked_sub(1).map(|prev| &nodes[prev]) {
        Some(prev) if prev.covers(key) => ix - 1,
        _ => ix,
    }
}

/// Checks that keys strictly increase and no gap swallows the next node.
pub fn validate_sequence(nodes: &[Node]) -> Result<()> {
    for pair in nodes.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.end_key() >= &next.key {
            return Err(DecodeError::invalid_graph(format!(
                "node {:?} overlaps or precedes {:?}",
                next.key, prev.key
            )));
        }
    }
    for node in nodes {
        if node.end_key() < &node.key {
            return Err(DecodeError::invalid_graph(format!(
                "range {:?} ends before it starts",
                node.key
            )));
        }
        if let NodeBody::Branch(children) = &node.body {
            validate_sequence(children)?;
        }
    }
    Ok(())
}
