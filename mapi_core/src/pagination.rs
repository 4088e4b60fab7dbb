//! Cursor-following over the listing envelope.
//!
//! Every collection response is a JSON object holding one items array plus
//! `next`/`prev` cursor URLs. [`Pages`] walks `next` one fetch at a time;
//! [`Pages::collect_items`] flattens the walk into a single ordered `Vec`.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use url::Url;

use crate::client::MapiClient;
use crate::error::MapiError;
use crate::response::MapiResponse;
use crate::transport::Transport;

pub const NEXT_FIELD: &str = "next";
pub const PREV_FIELD: &str = "prev";

#[derive(Copy, Clone, Debug)]
pub struct Caps {
    pub max_pages: u32,
    pub max_items: u64,
    pub detect_loops: bool,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            max_pages: 1_000,
            max_items: 1_000_000,
            detect_loops: true,
        }
    }
}

impl Caps {
    #[inline]
    pub fn max_pages(mut self, v: u32) -> Self {
        self.max_pages = v;
        self
    }
    #[inline]
    pub fn max_items(mut self, v: u64) -> Self {
        self.max_items = v;
        self
    }
    #[inline]
    pub fn detect_loops(mut self, v: bool) -> Self {
        self.detect_loops = v;
        self
    }
}

/// Where the items of a page live.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ItemsKey {
    /// The single array field left once `next`/`prev` are removed.
    #[default]
    Infer,
    /// A known field name (e.g. `"uris"`).
    Named(Cow<'static, str>),
}

impl ItemsKey {
    #[inline]
    pub fn named(key: impl Into<Cow<'static, str>>) -> Self {
        ItemsKey::Named(key.into())
    }
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl Page {
    pub fn from_response(resp: &MapiResponse, key: &ItemsKey) -> Result<Page, MapiError> {
        Page::parse(resp.json()?, key)
    }

    /// Splits a decoded page into items and cursors.
    ///
    /// A page without `next`, or without a recognisable items array, is a
    /// protocol violation; partial data is never returned.
    pub fn parse(value: Value, key: &ItemsKey) -> Result<Page, MapiError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(MapiError::protocol(format!(
                    "listing page is not a JSON object (got {})",
                    type_name(&other)
                )));
            }
        };

        let next = match obj.remove(NEXT_FIELD) {
            Some(v) => cursor(NEXT_FIELD, v)?,
            None => return Err(MapiError::protocol("listing page has no `next` field")),
        };
        let prev = match obj.remove(PREV_FIELD) {
            Some(v) => cursor(PREV_FIELD, v)?,
            None => None,
        };

        let items = match key {
            ItemsKey::Named(k) => match obj.remove(k.as_ref()) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(MapiError::protocol(format!(
                        "listing field `{k}` is not an array (got {})",
                        type_name(&other)
                    )));
                }
                None => {
                    return Err(MapiError::protocol(format!(
                        "listing page has no `{k}` field"
                    )));
                }
            },
            ItemsKey::Infer => infer_items(obj)?,
        };

        Ok(Page { items, next, prev })
    }
}

fn infer_items(obj: Map<String, Value>) -> Result<Vec<Value>, MapiError> {
    let mut found: Option<(String, Vec<Value>)> = None;
    for (k, v) in obj {
        if let Value::Array(items) = v {
            if let Some((first, _)) = &found {
                return Err(MapiError::protocol(format!(
                    "listing page has several collections (`{first}`, `{k}`)"
                )));
            }
            found = Some((k, items));
        }
    }
    found
        .map(|(_, items)| items)
        .ok_or_else(|| MapiError::protocol("listing page has no items collection"))
}

fn cursor(field: &'static str, v: Value) -> Result<Option<String>, MapiError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(MapiError::protocol(format!(
            "`{field}` must be a URL or null (got {})",
            type_name(&other)
        ))),
    }
}

/// Cursors may be relative to the page they came from.
fn resolve(page_url: &str, cursor: &str) -> Result<String, MapiError> {
    Url::parse(page_url)
        .and_then(|base| base.join(cursor))
        .map(String::from)
        .map_err(|e| MapiError::protocol(format!("bad cursor {cursor:?}: {e}")))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Forward-only walk over a listing, one GET per page.
///
/// Each call to [`MapiClient::pages`] starts a fresh traversal from the first
/// URL; a started traversal cannot be rewound. After an error the walk ends.
pub struct Pages<'a, T: Transport> {
    client: &'a MapiClient<T>,
    key: ItemsKey,
    caps: Caps,
    next: Option<String>,
    page_index: u32,
    items_seen: u64,
    visited: HashSet<String>,
}

impl<'a, T: Transport> Pages<'a, T> {
    pub(crate) fn new(client: &'a MapiClient<T>, url: String, key: ItemsKey, caps: Caps) -> Self {
        Self {
            client,
            key,
            caps,
            next: Some(url),
            page_index: 0,
            items_seen: 0,
            visited: HashSet::new(),
        }
    }

    #[inline]
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    #[inline]
    pub fn with_items_key(mut self, key: ItemsKey) -> Self {
        self.key = key;
        self
    }

    /// Number of pages fetched so far.
    #[inline]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }

    /// Fetches the next page, or `None` once `next` was null.
    pub async fn next_page(&mut self) -> Option<Result<Page, MapiError>> {
        let url = self.next.take()?;
        match self.fetch(url).await {
            Ok(page) => {
                self.next = page.next.clone();
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// Drains the remaining pages into one ordered sequence.
    pub async fn collect_items(mut self) -> Result<Vec<Value>, MapiError> {
        let mut out = Vec::new();
        while let Some(page) = self.next_page().await {
            out.extend(page?.items);
        }
        Ok(out)
    }

    async fn fetch(&mut self, url: String) -> Result<Page, MapiError> {
        if self.page_index >= self.caps.max_pages {
            return Err(MapiError::PaginationLimit(
                format!(
                    "max_pages reached (max_pages={} seen_items={} next={})",
                    self.caps.max_pages, self.items_seen, url
                )
                .into(),
            ));
        }
        if self.caps.detect_loops && !self.visited.insert(url.clone()) {
            return Err(MapiError::protocol(format!(
                "pagination loop detected (page_index={} next={})",
                self.page_index, url
            )));
        }

        let mut page = self
            .client
            .fetch_page(&url, &self.key, self.page_index)
            .await?;
        self.page_index += 1;
        page.next = page.next.map(|n| resolve(&url, &n)).transpose()?;
        page.prev = page.prev.map(|p| resolve(&url, &p)).transpose()?;

        let total = self.items_seen.saturating_add(page.items.len() as u64);
        if total > self.caps.max_items {
            return Err(MapiError::PaginationLimit(
                format!(
                    "max_items reached (max={} seen={})",
                    self.caps.max_items, total
                )
                .into(),
            ));
        }
        self.items_seen = total;
        Ok(page)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_the_single_collection() {
        let page = Page::parse(
            json!({"uris": [1, 2], "next": "https://h/pos/?cursor=2", "prev": null}),
            &ItemsKey::Infer,
        )
        .unwrap();
        assert_eq!(page.items, vec![json!(1), json!(2)]);
        assert_eq!(page.next.as_deref(), Some("https://h/pos/?cursor=2"));
        assert_eq!(page.prev, None);
    }

    #[test]
    fn scalar_fields_do_not_count_as_collections() {
        let page = Page::parse(
            json!({"count": 3, "settlements": [{"id": "s1"}], "next": null}),
            &ItemsKey::Infer,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn missing_collection_is_a_protocol_error() {
        let err = Page::parse(json!({"next": null, "prev": null}), &ItemsKey::Infer).unwrap_err();
        assert!(matches!(err, MapiError::Protocol(_)));

        let err = Page::parse(json!({"items": [], "next": null}), &ItemsKey::named("uris"))
            .unwrap_err();
        assert!(matches!(err, MapiError::Protocol(m) if m.contains("uris")));
    }

    #[test]
    fn ambiguous_or_malformed_envelopes_are_rejected() {
        let err = Page::parse(json!({"a": [], "b": [], "next": null}), &ItemsKey::Infer)
            .unwrap_err();
        assert!(matches!(err, MapiError::Protocol(_)));

        let err = Page::parse(json!({"items": []}), &ItemsKey::Infer).unwrap_err();
        assert!(matches!(err, MapiError::Protocol(m) if m.contains("next")));

        let err = Page::parse(json!({"items": [], "next": 7}), &ItemsKey::Infer).unwrap_err();
        assert!(matches!(err, MapiError::Protocol(_)));

        let err = Page::parse(json!([1, 2]), &ItemsKey::Infer).unwrap_err();
        assert!(matches!(err, MapiError::Protocol(m) if m.contains("array")));
    }
}
