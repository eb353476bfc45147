#![forbid(unsafe_code)]

//! Queries: the tagged tree the decoder walks, and its provider-facing forms.

/// Tagged query tree.
///
/// Leaf, field, item and reference selections as one sum type.
pub mod ast;

/// Query tree to encoded node tree, with reference hoisting.
pub mod encode;

/// Porcelain JSON parsing and validation.
pub mod parse;

/// Encoded node tree to the nested shape handed to providers.
pub mod shape;

pub use ast::{Item, Query, RefQuery};
pub use encode::{encode_query, merge, QueryNode};
pub use shape::decorate_query;
