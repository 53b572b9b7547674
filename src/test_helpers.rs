//! Shared test utilities for the folio test suite.
//!
//! Builders for attributes, pages and whole blog structures, plus lookup
//! helpers that panic with the available keys on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let blog = structure(&[
//!     ("posts/hello.md", "title: Hello\ntags: [rust]"),
//!     ("about.md", ""),
//! ]);
//! let page = find_page(&blog, "hello");
//! assert_eq!(page.title, "Hello");
//! ```

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::config::SiteConfig;
use crate::frontmatter::{Attributes, MetadataError};
use crate::index;
use crate::types::{BlogStructure, Page, PageIdentity};

// =========================================================================
// Builders
// =========================================================================

/// Parse a YAML mapping into attributes. Panics on malformed YAML.
pub fn attributes(yaml: &str) -> Attributes {
    if yaml.trim().is_empty() {
        return Attributes::new();
    }
    match serde_yaml::from_str::<serde_json::Value>(yaml).unwrap() {
        serde_json::Value::Object(map) => map,
        other => panic!("fixture YAML is not a mapping: {other}"),
    }
}

pub fn files(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// Fixed build timestamp so feed dates are comparable.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A page dated `2020-01-<day>`, or undated.
pub fn page_with_date(path: &str, day: Option<u32>) -> Page {
    let mut page = Page::new(PageIdentity {
        slug: path.trim_end_matches(".md").to_string(),
        path: path.to_string(),
        url: format!("/{}", path.trim_end_matches(".md")),
    });
    page.title = path.to_string();
    page.date = day.map(|d| Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap());
    page
}

/// Index `(path, front matter YAML)` pairs with the default config.
pub fn structure(entries: &[(&str, &str)]) -> BlogStructure {
    structure_with(entries, &SiteConfig::default())
}

pub fn structure_with(entries: &[(&str, &str)], config: &SiteConfig) -> BlogStructure {
    let yaml: HashMap<String, String> = entries
        .iter()
        .map(|(path, yaml)| (path.to_string(), yaml.to_string()))
        .collect();
    let source = move |path: &str| -> Result<Attributes, MetadataError> {
        Ok(yaml.get(path).map(|y| attributes(y)).unwrap_or_default())
    };
    let paths: Vec<&str> = entries.iter().map(|(path, _)| *path).collect();
    index::build(&files(&paths), &source, config, now()).unwrap()
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Write `(relative path, contents)` pairs below `root`, creating directories.
pub fn write_tree(root: &Path, entries: &[(&str, &str)]) {
    for (path, contents) in entries {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(target, contents).unwrap();
    }
}

/// Write a solid-color image of the given size. The format follows the
/// extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    img.save(path).unwrap();
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a page by slug. Panics if not found.
pub fn find_page<'a>(blog: &'a BlogStructure, slug: &str) -> &'a Page {
    blog.pages
        .values()
        .find(|p| p.slug() == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = blog.pages.values().map(|p| p.slug()).collect();
            panic!("page '{slug}' not found. Available: {slugs:?}")
        })
}

/// Titles of the pages a key list refers to, in list order.
pub fn page_titles<'a>(blog: &'a BlogStructure, keys: &'a [String]) -> Vec<&'a str> {
    blog.pages_of(keys).map(|p| p.title.as_str()).collect()
}
