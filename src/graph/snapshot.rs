//! The root node sequence shared by every lookup of one decode pass.

use serde_json::Value;
use tracing::trace;

use super::node::{find_first, validate_sequence, Node, NodeBody};
use super::porcelain;
use crate::codec::{decode_path, EncodedKey};
use crate::error::{DecodeError, Result};

/// What a path resolves to inside a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolved<'g> {
    /// Confirmed absent.
    Absent,
    /// Not known to this snapshot.
    Unknown,
    /// A literal value.
    Leaf {
        /// The literal.
        value: &'g Value,
        /// Opaque `$val` literal.
        is_val: bool,
    },
    /// A nested sequence.
    Seq(&'g [Node]),
}

/// Immutable root node sequence.
///
/// Decode passes borrow the snapshot; nothing inside it is ever mutated
/// after construction, so concurrent passes need no coordination.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    root: Vec<Node>,
}

impl Snapshot {
    /// Wraps a root sequence after checking its ordering invariants.
    pub fn new(root: Vec<Node>) -> Result<Self> {
        validate_sequence(&root)?;
        Ok(Self { root })
    }

    /// Builds a snapshot from provider-shaped JSON.
    pub fn from_porcelain(value: &Value) -> Result<Self> {
        Self::new(porcelain::encode_graph(value)?)
    }

    /// Root sequence.
    pub fn root(&self) -> &[Node] {
        &self.root
    }

    /// Resolves `path`, following links met on the way.
    ///
    /// Each link followed costs one hop; more than `max_hops` fails with
    /// [`DecodeError::ReferenceDepthExceeded`]. Descending through a
    /// literal fails with [`DecodeError::UnsupportedReferenceTarget`].
    pub fn lookup(&self, path: &[EncodedKey], max_hops: usize) -> Result<Resolved<'_>> {
        let mut segments: Vec<EncodedKey> = path.to_vec();
        let mut hops = 0;
        let mut current: &[Node] = &self.root;
        let mut i = 0;
        while i < segments.len() {
            let key = &segments[i];
            let Some(node) = current.get(find_first(current, key)) else {
                return Ok(Resolved::Unknown);
            };
            if !node.is_range() && &node.key != key {
                return Ok(Resolved::Unknown);
            }
            let last = i + 1 == segments.len();
            match &node.body {
                NodeBody::Link(target) => {
                    hops += 1;
                    if hops > max_hops {
                        return Err(DecodeError::ReferenceDepthExceeded {
                            path: path_json(path),
                            max: max_hops,
                        });
                    }
                    trace!(hops, target = ?target, "following link");
                    segments = target
                        .iter()
                        .cloned()
                        .chain(segments[i + 1..].iter().cloned())
                        .collect();
                    current = &self.root;
                    i = 0;
                    continue;
                }
                NodeBody::Branch(children) if last => return Ok(Resolved::Seq(children)),
                NodeBody::Branch(children) => current = children,
                NodeBody::Leaf { value, is_val } if last => {
                    return Ok(Resolved::Leaf {
                        value,
                        is_val: *is_val,
                    })
                }
                NodeBody::Leaf { .. } => {
                    return Err(DecodeError::UnsupportedReferenceTarget {
                        path: path_json(path),
                    })
                }
                NodeBody::Range { .. } => {
                    return Ok(if node.covers(key) {
                        Resolved::Absent
                    } else {
                        Resolved::Unknown
                    })
                }
            }
            i += 1;
        }
        Ok(Resolved::Seq(current))
    }
}

fn path_json(path: &[EncodedKey]) -> Value {
    decode_path(path).map_or_else(
        |_| Value::String(format!("{path:?}")),
        Value::Array,
    )
}
