//! Graph query decoding.
//!
//! A provider answers a query with a flat, key-sorted, partially-lazy
//! encoding of a subgraph. This crate rebuilds the nested result the query
//! asked for: it follows `$ref` links against one immutable [`Snapshot`],
//! keeps confirmed-absent data (`null`) apart from data never fetched, and
//! derives `$page`/`$next`/`$prev` cursors for paginated collections.
//!
//! ```
//! use graphweave::{decode, Query, Snapshot};
//! use serde_json::json;
//!
//! let snapshot = Snapshot::from_porcelain(&json!({
//!     "users": {"orwell": {"name": "George Orwell"}},
//! }))?;
//! let query = Query::parse(&json!({"$ref": "users.orwell", "name": true}))?;
//! let tree = decode(&snapshot, &query)?.expect("known");
//! assert_eq!(
//!     tree.to_json(),
//!     json!({"$ref": ["users", "orwell"], "name": "George Orwell"})
//! );
//! # Ok::<(), graphweave::DecodeError>(())
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod graph;
pub mod logging;
pub mod primitives;
pub mod query;

pub use codec::{decode_key, encode_key, Bounds, EncodedKey, Range};
pub use config::DecodeConfig;
pub use decode::{decode, decode_with, PageMeta, Tree};
pub use error::{DecodeError, Result};
pub use graph::{decode_graph, encode_graph, Node, NodeBody, Snapshot};
pub use query::{decorate_query, encode_query, Query};
