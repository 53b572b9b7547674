//! Navigation map and table-of-contents summary.
//!
//! Both views walk the taxonomy the same way: categories in insertion order
//! (the root category included), pages in their already-sorted order. Each
//! page gets a dotted level `"<category>.<page>"`, both counters 1-based.

use crate::types::BlogStructure;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationEntry {
    pub introduction: bool,
    pub level: String,
    /// Position of the page within its category, 1-based.
    pub index: usize,
    pub title: String,
}

/// Navigation entries keyed by page logical path.
pub type Navigation = IndexMap<String, NavigationEntry>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub path: String,
    pub title: String,
    pub level: String,
    /// Always empty: summary entries are leaves.
    pub articles: Vec<SummaryEntry>,
    pub exists: bool,
    pub external: bool,
    pub introduction: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub chapters: Vec<SummaryEntry>,
}

/// Walk every published page as `(level, page index, path, title)`.
fn walk(blog: &BlogStructure) -> impl Iterator<Item = (String, usize, &str, &str)> {
    blog.taxonomy
        .categories
        .values()
        .enumerate()
        .flat_map(move |(ci, category)| {
            blog.pages_of(&category.pages)
                .enumerate()
                .map(move |(pi, page)| {
                    (
                        format!("{}.{}", ci + 1, pi + 1),
                        pi + 1,
                        page.path(),
                        page.title.as_str(),
                    )
                })
        })
}

pub fn build_navigation(blog: &BlogStructure) -> Navigation {
    walk(blog)
        .map(|(level, index, path, title)| {
            (
                path.to_string(),
                NavigationEntry {
                    introduction: false,
                    level,
                    index,
                    title: title.to_string(),
                },
            )
        })
        .collect()
}

pub fn build_summary(blog: &BlogStructure) -> Summary {
    let chapters = walk(blog)
        .map(|(level, _, path, title)| SummaryEntry {
            path: path.to_string(),
            title: title.to_string(),
            level,
            articles: Vec::new(),
            exists: true,
            external: false,
            introduction: false,
        })
        .collect();
    Summary { chapters }
}
