//! Page metadata for paginated array results.
//!
//! Everything here is derived from the requested bounds and the window the
//! slicer returned; no provider is consulted.

use serde_json::{Map, Value};
use tracing::trace;

use crate::codec::{Bounds, Range};

/// `$page`, `$next` and `$prev` of a paginated array.
#[derive(Clone, Debug, PartialEq)]
pub struct PageMeta {
    /// Bounds that re-fetch exactly this window.
    pub page: Bounds,
    /// Bounds of the following page; `None` at the end of the data.
    pub next: Option<Bounds>,
    /// Bounds of the preceding page; `None` at the start of the data.
    pub prev: Option<Bounds>,
}

impl PageMeta {
    pub(crate) fn write(&self, out: &mut Map<String, Value>) {
        let render = |bounds: &Option<Bounds>| bounds.as_ref().map_or(Value::Null, Bounds::to_json);
        out.insert("$page".into(), self.page.to_json());
        out.insert("$next".into(), render(&self.next));
        out.insert("$prev".into(), render(&self.prev));
    }
}

/// Derives page metadata.
///
/// `produced` is the number of items the window yielded; `first` and
/// `last` are the cursors of its first and last item.
pub fn page_meta(
    bounds: &Bounds,
    produced: usize,
    first: Option<&Value>,
    last: Option<&Value>,
) -> PageMeta {
    let requested = &bounds.range;
    let count = match requested.count() {
        Some(count) if !requested.all => count,
        _ => {
            return PageMeta {
                page: bounds.clone(),
                next: None,
                prev: None,
            }
        }
    };

    let mut page = Range {
        since: requested.since.clone(),
        after: requested.after.clone(),
        before: requested.before.clone(),
        until: requested.until.clone(),
        all: true,
        ..Range::default()
    };
    if produced == count && count > 0 {
        if requested.first.is_some() {
            if let Some(last) = last {
                page.until = Some(last.clone());
                page.before = None;
            }
        } else if let Some(first) = first {
            page.since = Some(first.clone());
            page.after = None;
        }
    }

    let with_filter = |range: Range| Bounds {
        filter: bounds.filter.clone(),
        range,
    };
    let prev = match (&page.after, &page.since) {
        (Some(after), _) => Some(Range {
            last: Some(count),
            until: Some(after.clone()),
            ..Range::default()
        }),
        (None, Some(since)) => Some(Range {
            last: Some(count),
            before: Some(since.clone()),
            ..Range::default()
        }),
        (None, None) => None,
    };
    let next = match (&page.before, &page.until) {
        (Some(before), _) => Some(Range {
            first: Some(count),
            since: Some(before.clone()),
            ..Range::default()
        }),
        (None, Some(until)) => Some(Range {
            first: Some(count),
            after: Some(until.clone()),
            ..Range::default()
        }),
        (None, None) => None,
    };
    trace!(produced, count, more = next.is_some(), "page metadata");
    PageMeta {
        page: with_filter(page),
        next: next.map(with_filter),
        prev: prev.map(with_filter),
    }
}
