//! Decoded result trees.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::page::PageMeta;

/// Provenance carried by object, array and `$val` results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Meta {
    /// Key of the item within a paginated collection.
    pub key: Option<Value>,
    /// Path this result was reached through.
    pub reference: Option<Vec<Value>>,
}

impl Meta {
    fn is_empty(&self) -> bool {
        self.key.is_none() && self.reference.is_none()
    }

    fn write(&self, out: &mut Map<String, Value>) {
        if let Some(key) = &self.key {
            out.insert("$key".into(), key.clone());
        }
        if let Some(reference) = &self.reference {
            out.insert("$ref".into(), Value::Array(reference.clone()));
        }
    }
}

/// An object result. Fields whose value is unknown are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectTree {
    /// Provenance of the object.
    pub meta: Meta,
    /// Known fields by name.
    pub fields: BTreeMap<String, Tree>,
}

/// An array result. `None` items are unknown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayTree {
    /// Provenance of the array.
    pub meta: Meta,
    /// Items in query or cursor order.
    pub items: Vec<Option<Tree>>,
    /// Present when the array came from a paginated query.
    pub page: Option<PageMeta>,
}

/// A decoded result mirroring the shape of its query.
#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    /// Confirmed absent.
    Null,
    /// A scalar, or a value materialized whole.
    Value(Value),
    /// An opaque `$val` object or array.
    Val {
        /// The stored object or array.
        value: Value,
        /// Provenance of the value.
        meta: Meta,
    },
    /// Selected fields of an object.
    Object(ObjectTree),
    /// Selected items of a collection.
    Array(ArrayTree),
}

impl Tree {
    /// Provenance, for results that carry it.
    pub fn meta(&self) -> Option<&Meta> {
        match self {
            Self::Val { meta, .. } => Some(meta),
            Self::Object(object) => Some(&object.meta),
            Self::Array(array) => Some(&array.meta),
            Self::Null | Self::Value(_) => None,
        }
    }

    /// Mutable provenance; scalars and nulls have none.
    pub fn meta_mut(&mut self) -> Option<&mut Meta> {
        match self {
            Self::Val { meta, .. } => Some(meta),
            Self::Object(object) => Some(&mut object.meta),
            Self::Array(array) => Some(&mut array.meta),
            Self::Null | Self::Value(_) => None,
        }
    }

    /// Field of an object result.
    pub fn get(&self, field: &str) -> Option<&Tree> {
        match self {
            Self::Object(object) => object.fields.get(field),
            _ => None,
        }
    }

    /// Items of an array result; `None` is unknown, `Some(Tree::Null)`
    /// is confirmed absent.
    pub fn items(&self) -> Option<&[Option<Tree>]> {
        match self {
            Self::Array(array) => Some(&array.items),
            _ => None,
        }
    }

    /// Page metadata of a paginated array result.
    pub fn page(&self) -> Option<&PageMeta> {
        match self {
            Self::Array(array) => array.page.as_ref(),
            _ => None,
        }
    }

    /// True for a confirmed absent result.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the result as porcelain JSON.
    ///
    /// Metadata is written inline as `$key`/`$ref`/`$val` fields. Arrays
    /// that carry metadata or pagination render as an object holding the
    /// items under `$items`.
    ///
    /// The rendering is lossy for array items: unknown and absent items
    /// both render as `null`. Use [`Tree::items`] to tell them apart.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Value(value) => value.clone(),
            Self::Val { value, meta } => {
                let mut out = match value {
                    Value::Object(fields) => {
                        let mut out = fields.clone();
                        out.insert("$val".into(), Value::Bool(true));
                        out
                    }
                    other => {
                        let mut out = Map::new();
                        out.insert("$val".into(), other.clone());
                        out
                    }
                };
                meta.write(&mut out);
                Value::Object(out)
            }
            Self::Object(object) => {
                let mut out: Map<String, Value> = object
                    .fields
                    .iter()
                    .map(|(name, tree)| (name.clone(), tree.to_json()))
                    .collect();
                object.meta.write(&mut out);
                Value::Object(out)
            }
            Self::Array(array) => {
                let items = Value::Array(
                    array
                        .items
                        .iter()
                        .map(|item| item.as_ref().map_or(Value::Null, Tree::to_json))
                        .collect(),
                );
                if array.page.is_none() && array.meta.is_empty() {
                    return items;
                }
                let mut out = Map::new();
                out.insert("$items".into(), items);
                if let Some(page) = &array.page {
                    page.write(&mut out);
                }
                array.meta.write(&mut out);
                Value::Object(out)
            }
        }
    }
}
