//! Tagged query tree.
//!
//! Every shape decision (is this a pagination spec, a reference, an index)
//! is made once while parsing; the decoder only matches on variants.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::codec::{Bounds, SplitRef};

/// A query over a graph snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Select the value found here as a whole.
    Leaf,
    /// Select named fields of an object.
    Fields(BTreeMap<String, Query>),
    /// Select items of a collection.
    Items(Vec<Item>),
    /// Follow a reference to another path of the same snapshot.
    Reference(Box<RefQuery>),
}

/// One item selection of an [`Query::Items`] query.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// Positional item, keyed by its index in the query.
    Index {
        /// Position in the collection.
        index: usize,
        /// Selection applied to the item.
        query: Query,
    },
    /// Item addressed by an explicit key.
    ///
    /// A key of the form `{ "$cursor": c, ..filter }` addresses cursor `c`
    /// inside the sub-collection selected by `filter`.
    Key {
        /// The porcelain key.
        key: Value,
        /// Selection applied to the item.
        query: Query,
    },
    /// A paginated window of the collection.
    Page {
        /// Filters and cursor range of the window.
        bounds: Bounds,
        /// Selection applied to each item of the window.
        query: Query,
    },
}

/// An explicit `$ref` query.
#[derive(Clone, Debug, PartialEq)]
pub struct RefQuery {
    /// The reference as written, stamped onto the result.
    pub reference: Vec<Value>,
    /// The lookup path with any trailing range split off.
    pub target: SplitRef,
    /// Selection applied at the target; wrapped in a page when the
    /// reference ends in a range.
    pub query: Query,
}

impl Query {
    /// Object query selecting `fields`.
    pub fn fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Query)>,
        K: Into<String>,
    {
        Self::Fields(fields.into_iter().map(|(k, q)| (k.into(), q)).collect())
    }

    /// A single paginated window.
    pub fn page(bounds: Bounds, query: Query) -> Self {
        Self::Items(vec![Item::Page { bounds, query }])
    }

    /// True for [`Query::Leaf`].
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }
}

impl Item {
    /// Selection applied to the item(s).
    pub fn query(&self) -> &Query {
        match self {
            Self::Index { query, .. } | Self::Key { query, .. } | Self::Page { query, .. } => query,
        }
    }
}
