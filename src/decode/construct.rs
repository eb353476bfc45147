//! The recursive tree constructor.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::page::{page_meta, PageMeta};
use super::tree::{ArrayTree, Meta, ObjectTree, Tree};
use super::{Decoder, Plum, Sequence};
use crate::codec::{decode_key, decode_path, encode_index, encode_segments, Bounds, EncodedKey};
use crate::error::{DecodeError, Result};
use crate::graph::decode_graph;
use crate::query::{Item, Query, RefQuery};

impl<'g> Decoder<'g, '_> {
    /// Builds the result of `query` over `plum`; `None` means unknown.
    pub(crate) fn construct(&self, plum: Plum<'g>, query: &Query) -> Result<Option<Tree>> {
        let plum = match plum {
            Plum::Absent => return Ok(Some(Tree::Null)),
            Plum::Unknown => Plum::Seq(Sequence::empty()),
            other => other,
        };
        let mut tree = match query {
            Query::Reference(reference) => return self.construct_reference(reference),
            Query::Leaf => match self.construct_leaf(&plum)? {
                Some(tree) => tree,
                None => return Ok(None),
            },
            Query::Fields(fields) => {
                let mut object = ObjectTree::default();
                for (name, sub) in fields {
                    let child = self.descend(&plum, &EncodedKey::field(name))?;
                    if let Some(tree) = self.construct(child, sub)? {
                        object.fields.insert(name.clone(), tree);
                    }
                }
                Tree::Object(object)
            }
            Query::Items(items) => Tree::Array(self.construct_items(&plum, items)?),
        };
        if let (Plum::Seq(Sequence { reference: Some(path), .. }), Some(meta)) = (&plum, tree.meta_mut()) {
            meta.reference = Some(decode_path(path)?);
        }
        Ok(Some(tree))
    }

    fn construct_reference(&self, reference: &RefQuery) -> Result<Option<Tree>> {
        let path = encode_segments(&reference.target.path)?;
        trace!(reference = ?reference.reference, "explicit reference");
        let mut target: Plum<'g> = self
            .snapshot
            .lookup(&path, self.config.max_reference_hops)?
            .into();
        if let (Some(_), Some(filter), Plum::Seq(seq)) =
            (&reference.target.range, &reference.target.filter, &mut target)
        {
            seq.filter = Some(filter.clone());
        }
        let mut tree = self.construct(target, &reference.query)?;
        if let Some(meta) = tree.as_mut().and_then(Tree::meta_mut) {
            meta.reference = Some(reference.reference.clone());
        }
        Ok(tree)
    }

    fn construct_items(&self, plum: &Plum<'g>, items: &[Item]) -> Result<ArrayTree> {
        let mut array = ArrayTree::default();
        let mut paged: Option<&Bounds> = None;
        for item in items {
            match item {
                Item::Index { index, query } => {
                    let child = self.descend(plum, &encode_index(*index))?;
                    array.items.push(self.construct(child, query)?);
                }
                Item::Key { key, query } => {
                    let child = self.descend_key(plum, key)?;
                    array.items.push(self.construct(child, query)?);
                }
                Item::Page { bounds, query } => {
                    if let Some(first) = paged {
                        return Err(DecodeError::MultipleRangeQueries {
                            first: first.to_json(),
                            second: bounds.to_json(),
                        });
                    }
                    paged = Some(bounds);
                    array.page = Some(self.construct_page(plum, bounds, query, &mut array.items)?);
                }
            }
        }
        Ok(array)
    }

    fn construct_page(
        &self,
        plum: &Plum<'g>,
        bounds: &Bounds,
        query: &Query,
        out: &mut Vec<Option<Tree>>,
    ) -> Result<PageMeta> {
        let window = self.slice(plum, bounds)?;
        let mut cursors = Vec::new();
        for node in window.nodes.iter().filter(|node| !node.is_range()) {
            let cursor = decode_key(&node.key)?;
            let mut item = self.construct(self.resolve(node)?, query)?;
            if let Some(meta) = item.as_mut().and_then(Tree::meta_mut) {
                meta.key = Some(match &window.filter {
                    Some(filter) => {
                        let mut key: Map<String, Value> = filter.clone().into_iter().collect();
                        key.insert("$cursor".into(), cursor.clone());
                        Value::Object(key)
                    }
                    None => cursor.clone(),
                });
            }
            out.push(item);
            cursors.push(cursor);
        }
        Ok(page_meta(bounds, cursors.len(), cursors.first(), cursors.last()))
    }

    fn construct_leaf(&self, plum: &Plum<'g>) -> Result<Option<Tree>> {
        let tree = match plum {
            Plum::Seq(seq) if seq.nodes.is_empty() => return Ok(None),
            Plum::Leaf { value, is_val: true } if value.is_object() || value.is_array() => Tree::Val {
                value: (*value).clone(),
                meta: Meta::default(),
            },
            Plum::Leaf { value, .. } if !value.is_object() && !value.is_array() => {
                Tree::Value((*value).clone())
            }
            Plum::Seq(seq) => {
                let mut value = decode_graph(seq.nodes)?;
                if let (Some(path), Value::Object(fields)) = (seq.reference, &mut value) {
                    fields.insert("$ref".into(), Value::Array(decode_path(path)?));
                }
                Tree::Value(value)
            }
            other => {
                let found = format!("{other:?}");
                if self.config.strict_leaves {
                    return Err(DecodeError::UnexpectedGraphShape { found });
                }
                debug!(found = %found, "leaf query met an undecodable value");
                return Ok(None);
            }
        };
        Ok(Some(tree))
    }
}
