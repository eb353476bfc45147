#![forbid(unsafe_code)]

//! Result reconstruction.
//!
//! [`decode`] walks a [`Query`] over a [`Snapshot`] and rebuilds a [`Tree`]
//! that mirrors the query's shape. One pass is a synchronous, read-only
//! recursion: it borrows the snapshot, never mutates it, and allocates a
//! fresh tree. Passes over the same snapshot may run concurrently.

use tracing::debug;

use crate::codec::{EncodedKey, Filter};
use crate::config::DecodeConfig;
use crate::error::Result;
use crate::graph::{Node, Resolved, Snapshot};
use crate::query::Query;

mod construct;
mod locate;
pub mod page;
mod slice;
pub mod tree;

pub use locate::{locate, Located};
pub use page::{page_meta, PageMeta};
pub use slice::slice_window;
pub use tree::{ArrayTree, Meta, ObjectTree, Tree};

/// Decodes `query` against `snapshot` with the default configuration.
///
/// Returns `None` when the result as a whole is unknown.
pub fn decode(snapshot: &Snapshot, query: &Query) -> Result<Option<Tree>> {
    decode_with(snapshot, query, &DecodeConfig::default())
}

/// Decodes `query` against `snapshot`.
pub fn decode_with(snapshot: &Snapshot, query: &Query, config: &DecodeConfig) -> Result<Option<Tree>> {
    debug!(
        roots = snapshot.root().len(),
        max_hops = config.max_reference_hops,
        "decode pass"
    );
    let decoder = Decoder { snapshot, config };
    decoder.construct(Plum::Seq(Sequence::new(snapshot.root())), query)
}

/// What one step of a decode pass is looking at.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Plum<'g> {
    Absent,
    Unknown,
    Leaf { value: &'g serde_json::Value, is_val: bool },
    Seq(Sequence<'g>),
}

/// A node sequence plus the side-channel tags of the step that produced it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sequence<'g> {
    pub nodes: &'g [Node],
    /// Equality filter that selected this sub-collection.
    pub filter: Option<Filter>,
    /// Link path that led here.
    pub reference: Option<&'g [EncodedKey]>,
}

impl<'g> Sequence<'g> {
    pub fn new(nodes: &'g [Node]) -> Self {
        Self {
            nodes,
            filter: None,
            reference: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }
}

impl<'g> From<Resolved<'g>> for Plum<'g> {
    fn from(resolved: Resolved<'g>) -> Self {
        match resolved {
            Resolved::Absent => Plum::Absent,
            Resolved::Unknown => Plum::Unknown,
            Resolved::Leaf { value, is_val } => Plum::Leaf { value, is_val },
            Resolved::Seq(nodes) => Plum::Seq(Sequence::new(nodes)),
        }
    }
}

pub(crate) struct Decoder<'g, 'c> {
    snapshot: &'g Snapshot,
    config: &'c DecodeConfig,
}
