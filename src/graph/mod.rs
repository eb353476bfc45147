//! Graph snapshots: node sequences, their porcelain form, and path lookup.

pub mod node;
pub mod porcelain;
pub mod snapshot;

pub use node::{find_first, validate_sequence, Node, NodeBody};
pub use porcelain::{decode_graph, encode_graph};
pub use snapshot::{Resolved, Snapshot};
