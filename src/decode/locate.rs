//! Child lookup inside a node sequence.

use serde_json::Value;
use tracing::trace;

use super::slice::starts_with_default_bucket;
use super::{Decoder, Plum, Sequence};
use crate::codec::{encode_filter, encode_key, EncodedKey, Filter};
use crate::error::Result;
use crate::graph::{find_first, Node, NodeBody};

/// Outcome of searching one sequence for one key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Located<'g> {
    /// A node holds exactly this key.
    Found(&'g Node),
    /// A gap node covers the key.
    Absent,
    /// Nothing is known about the key.
    Unknown,
}

/// Finds the node for `key`, telling confirmed gaps from unknown keys.
pub fn locate<'g>(nodes: &'g [Node], key: &EncodedKey) -> Located<'g> {
    let Some(node) = nodes.get(find_first(nodes, key)) else {
        return Located::Unknown;
    };
    if node.covers(key) {
        Located::Absent
    } else if &node.key == key && !node.is_range() {
        Located::Found(node)
    } else {
        Located::Unknown
    }
}

impl<'g> Decoder<'g, '_> {
    /// Steps from `plum` into the child at `key`.
    ///
    /// Anything but a sequence has no children that are known.
    pub(crate) fn descend(&self, plum: &Plum<'g>, key: &EncodedKey) -> Result<Plum<'g>> {
        let Plum::Seq(seq) = plum else {
            return Ok(Plum::Unknown);
        };
        match locate(seq.nodes, key) {
            Located::Found(node) => self.resolve(node),
            Located::Absent => Ok(Plum::Absent),
            Located::Unknown => Ok(Plum::Unknown),
        }
    }

    /// Steps into the sub-collection selected by `filter`, tagging it with
    /// the filter when the node found heads a prefix bucket.
    pub(crate) fn descend_filter(&self, plum: &Plum<'g>, filter: &Filter) -> Result<Plum<'g>> {
        let key = encode_filter(filter)?;
        let Plum::Seq(seq) = plum else {
            return Ok(Plum::Unknown);
        };
        let node = match locate(seq.nodes, &key) {
            Located::Found(node) => node,
            Located::Absent => return Ok(Plum::Absent),
            Located::Unknown => return Ok(Plum::Unknown),
        };
        let mut child = self.resolve(node)?;
        if let (true, Plum::Seq(child)) = (node.prefix, &mut child) {
            child.filter = Some(filter.clone());
        }
        Ok(child)
    }

    /// Steps to a porcelain item key; `{ "$cursor": c, ..filter }` goes
    /// through the filter's bucket first, and a bare cursor through the
    /// default bucket when the collection has one.
    pub(crate) fn descend_key(&self, plum: &Plum<'g>, key: &Value) -> Result<Plum<'g>> {
        match key {
            Value::Object(args) if args.contains_key("$cursor") => {
                let mut filter: Filter = args.clone().into_iter().collect();
                let cursor = filter.remove("$cursor").unwrap_or(Value::Null);
                let bucket = match plum {
                    _ if !filter.is_empty() => self.descend_filter(plum, &filter)?,
                    Plum::Seq(seq) if starts_with_default_bucket(seq.nodes) => {
                        self.descend(plum, &EncodedKey::MIN)?
                    }
                    _ => plum.clone(),
                };
                if bucket == Plum::Absent {
                    return Ok(Plum::Absent);
                }
                self.descend(&bucket, &encode_key(&cursor)?)
            }
            other => self.descend(plum, &encode_key(other)?),
        }
    }

    /// The payload of a located node, following links against the snapshot.
    pub(crate) fn resolve(&self, node: &'g Node) -> Result<Plum<'g>> {
        let plum = match &node.body {
            NodeBody::Leaf { value, is_val } => Plum::Leaf {
                value,
                is_val: *is_val,
            },
            NodeBody::Branch(children) => Plum::Seq(Sequence::new(children)),
            NodeBody::Link(path) => {
                trace!(key = ?node.key, target = ?path, "resolving link");
                let mut target: Plum<'g> = self
                    .snapshot
                    .lookup(path, self.config.max_reference_hops)?
                    .into();
                if let Plum::Seq(seq) = &mut target {
                    seq.reference = Some(path.as_slice());
                }
                target
            }
            NodeBody::Range { .. } => Plum::Absent,
        };
        Ok(plum)
    }
}
