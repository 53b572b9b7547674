//! The blog structure shared by every build phase.
//!
//! Built once by [`crate::index`], read-only afterwards. Cross-references
//! between pages, categories and tags are keys into the maps of
//! [`BlogStructure`], never pointers:
//!
//! | Field | Holds |
//! |-------|-------|
//! | `Page::category` | category path |
//! | `Page::tags` | tag names |
//! | `Category::pages`, `Tag::pages` | page logical paths |
//! | `Category::related` | tag names |
//! | `Tag::related` | category paths |
//!
//! Everything serializes so renderers can hand the structure to templates.

use crate::paths;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Computed fields that identify a page. Never taken from metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    pub slug: String,
    /// Logical source path, content-root relative.
    pub path: String,
    pub url: String,
}

/// A published content page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    slug: String,
    path: String,
    url: String,
    pub title: String,
    pub draft: bool,
    pub publish: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Key of the page's category.
    pub category: String,
    /// Tag names, deduplicated.
    pub tags: Vec<String>,
    /// Custom metadata with no dedicated field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    /// Combined section content; empty until the page is rendered.
    pub content: String,
}

impl Page {
    pub(crate) fn new(identity: PageIdentity) -> Self {
        Self {
            slug: identity.slug,
            path: identity.path,
            url: identity.url,
            title: String::new(),
            draft: false,
            publish: true,
            date: None,
            category: String::new(),
            tags: Vec::new(),
            extra: BTreeMap::new(),
            content: String::new(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the page takes part in the build at all.
    pub fn is_published(&self) -> bool {
        !self.draft && self.publish
    }

    /// A string field of the custom metadata, if present.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Pages grouped by parent directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub url: String,
    pub pages: Vec<String>,
    pub related: Vec<String>,
    /// Page that publishes to this category's index path and replaces the
    /// generated listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_page: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Category {
    /// The implicit category holding top-level pages.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Output path of the generated listing.
    pub fn index_output(&self) -> String {
        paths::join(&self.path, paths::INDEX_DOCUMENT)
    }

    /// Whether a listing is generated for this category.
    pub fn has_listing(&self) -> bool {
        !self.is_root() && self.index_page.is_none()
    }
}

/// Free-form label attached to pages through metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub pages: Vec<String>,
    pub related: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Tag {
    pub fn index_output(&self) -> String {
        paths::join(&self.slug, paths::INDEX_DOCUMENT)
    }
}

/// Dated pages assembled for one syndication format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub url: String,
    pub pages: Vec<String>,
    /// Build timestamp.
    pub date: DateTime<Utc>,
}

impl Feed {
    /// Output path, the configured url without its leading `/`.
    pub fn output(&self) -> String {
        self.url.trim_start_matches('/').to_string()
    }
}

/// Site-wide values from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Site {
    pub title: String,
    pub author: Value,
    pub server: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Taxonomy {
    pub tags: IndexMap<String, Tag>,
    pub categories: IndexMap<String, Category>,
}

/// Everything the indexer knows about the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlogStructure {
    pub pages: IndexMap<String, Page>,
    pub taxonomy: Taxonomy,
    pub site: Site,
    pub feeds: IndexMap<String, Feed>,
}

/// Site data as templates see it: configuration values plus the categories.
#[derive(Debug, Serialize)]
pub struct SiteView<'a> {
    pub title: &'a str,
    pub author: &'a Value,
    pub server: &'a str,
    pub categories: &'a IndexMap<String, Category>,
}

impl BlogStructure {
    pub fn site_view(&self) -> SiteView<'_> {
        SiteView {
            title: &self.site.title,
            author: &self.site.author,
            server: &self.site.server,
            categories: &self.taxonomy.categories,
        }
    }

    /// Resolve page keys to pages, skipping keys with no page.
    pub fn pages_of<'a>(&'a self, keys: &'a [String]) -> impl Iterator<Item = &'a Page> + 'a {
        keys.iter().filter_map(|key| self.pages.get(key))
    }
}

/// Append `item` unless it is already present.
pub fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

/// Newest first; undated pages after every dated page.
pub fn compare_dates(a: Option<&DateTime<Utc>>, b: Option<&DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort page keys by their page's date with [`compare_dates`].
///
/// The sort is stable, so undated pages keep their encounter order.
pub fn sort_by_date(keys: &mut [String], pages: &IndexMap<String, Page>) {
    keys.sort_by(|a, b| {
        compare_dates(
            pages.get(a).and_then(|p| p.date.as_ref()),
            pages.get(b).and_then(|p| p.date.as_ref()),
        )
    });
}
