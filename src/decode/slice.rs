//! Bounded windows of a node sequence.

use tracing::trace;

use super::{Decoder, Plum, Sequence};
use crate::codec::{encode_range, Bounds, EncodedKey, RangeKey};
use crate::error::Result;
use crate::graph::Node;

impl<'g> Decoder<'g, '_> {
    /// Selects the window of `plum` described by `bounds`.
    ///
    /// Equality filters first select their sub-collection; without filters
    /// a collection whose first node is the default bucket is read through
    /// it. The window keeps the tags of the sequence it was cut from.
    /// Anything that is not a sequence yields an empty window.
    pub(crate) fn slice(&self, plum: &Plum<'g>, bounds: &Bounds) -> Result<Sequence<'g>> {
        let source = if !bounds.filter.is_empty() {
            self.descend_filter(plum, &bounds.filter)?
        } else {
            match plum {
                Plum::Seq(seq) if starts_with_default_bucket(seq.nodes) => {
                    self.descend(plum, &EncodedKey::MIN)?
                }
                other => other.clone(),
            }
        };
        let Plum::Seq(seq) = source else {
            return Ok(Sequence::empty());
        };
        let range = encode_range(&bounds.range)?;
        let window = slice_window(seq.nodes, &range);
        trace!(
            available = seq.nodes.len(),
            taken = window.len(),
            backward = range.backward,
            "range slice"
        );
        Ok(Sequence {
            nodes: window,
            ..seq
        })
    }
}

/// True when `nodes` keeps its unfiltered items in the zero-key bucket.
pub(super) fn starts_with_default_bucket(nodes: &[Node]) -> bool {
    nodes
        .first()
        .is_some_and(|node| node.prefix && node.key.is_min())
}

/// Cuts the window of `nodes` selected by `range`, in sequence order.
///
/// Only data nodes count toward the limit; gap nodes inside the window are
/// kept. A forward scan starts at the first node reaching the lower bound;
/// a backward scan ends at the last node starting at or below the upper
/// bound. Either scan stops at the opposite bound.
pub fn slice_window<'n>(nodes: &'n [Node], range: &RangeKey) -> &'n [Node] {
    if range.is_empty() {
        return &[];
    }
    let limit = range.limit.unwrap_or(usize::MAX);
    let mut taken = 0;
    if range.backward {
        let end = nodes.partition_point(|node| range.below_upper(&node.key));
        let mut start = end;
        while start > 0 && taken < limit {
            let node = &nodes[start - 1];
            if !range.above_lower(node.end_key()) {
                break;
            }
            if !node.is_range() {
                taken += 1;
            }
            start -= 1;
        }
        &nodes[start..end]
    } else {
        let start = nodes.partition_point(|node| !range.above_lower(node.end_key()));
        let mut end = start;
        while end < nodes.len() && taken < limit {
            let node = &nodes[end];
            if !range.below_upper(&node.key) {
                break;
            }
            if !node.is_range() {
                taken += 1;
            }
            end += 1;
        }
        &nodes[start..end]
    }
}
