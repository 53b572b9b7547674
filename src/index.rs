//! Content indexing and taxonomy construction.
//!
//! Runs once per build over the full list of discovered files and produces
//! the [`BlogStructure`] every later phase reads. Indexing is synchronous and
//! never touches storage beyond what the [`MetadataSource`] does.
//!
//! ## Layout
//!
//! ```text
//! content/
//! ├── about.md                 # page "about", root category ""
//! ├── posts/
//! │   ├── posts.md             # category page of "posts", lives in root category
//! │   ├── hello.md             # page "hello", category "posts"
//! │   └── tech/
//! │       ├── rust.md          # page "rust", category "posts/tech"
//! │       └── diagram.png      # asset, copied verbatim
//! └── folio.toml
//! ```
//!
//! ## Steps
//!
//! 1. Keep files with a content extension.
//! 2. Locate each one ([`PageLocation`]) and reject two files that publish
//!    to the same output path.
//! 3. Merge metadata ([`merge_page`]); a failing source counts as empty
//!    attributes.
//! 4. Drop drafts and unpublished pages.
//! 5. Attach the page to its category and tags, creating them lazily with
//!    their configured overrides and cross-linking them through `related`.
//! 6. Sort tag pages and non-root category pages newest first, then build
//!    the feeds.
//! 7. Reject generated outputs (category and tag listings, feeds) that land
//!    on a page or on each other. A page publishing to its category's index
//!    path replaces the generated listing.

use crate::config::{self, SiteConfig};
use crate::feed;
use crate::frontmatter::{Attributes, MetadataSource};
use crate::metadata::{PageDefaults, merge_page, sanitize_slug};
use crate::paths::{self, PageLocation};
use crate::types::{BlogStructure, Category, PageIdentity, Site, Tag, push_unique, sort_by_date};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("{first} and {second} both publish to {output}")]
    PathCollision {
        first: String,
        second: String,
        output: String,
    },
}

/// Category keys that front matter or config cannot set.
const CATEGORY_RESERVED: &[&str] = &["name", "slug", "related", "path", "url", "pages", "index_page"];
/// Tag keys that config cannot set.
const TAG_RESERVED: &[&str] = &["title", "slug", "related", "pages", "url"];

/// Build the blog structure from a file list.
///
/// `files` are content-root relative logical paths in discovery order; that
/// order decides category, tag and page insertion order. `now` stamps the
/// feeds.
pub fn build(
    files: &[String],
    source: &impl MetadataSource,
    config: &SiteConfig,
    now: DateTime<Utc>,
) -> Result<BlogStructure, IndexError> {
    let mut blog = BlogStructure {
        site: Site {
            title: config.title.clone(),
            author: config.author_value(),
            server: config.server.clone(),
        },
        ..BlogStructure::default()
    };

    let mut outputs: HashMap<String, &str> = HashMap::new();

    for file in files.iter().filter(|f| paths::is_content_file(f)) {
        let output = paths::output_path(file);
        if let Some(first) = outputs.insert(output.clone(), file) {
            return Err(IndexError::PathCollision {
                first: first.to_string(),
                second: file.clone(),
                output,
            });
        }

        let location = PageLocation::of(file);
        let attributes = source.read(file).unwrap_or_else(|e| {
            warn!("{file}: unreadable metadata, using defaults: {e}");
            Attributes::new()
        });
        let identity = PageIdentity {
            slug: location.slug.clone(),
            path: file.clone(),
            url: location.url(),
        };
        let mut page = merge_page(PageDefaults::for_slug(&location.slug), attributes, identity);

        if !page.is_published() {
            debug!("{file}: skipping draft");
            continue;
        }

        let category = blog
            .taxonomy
            .categories
            .entry(location.category_path.clone())
            .or_insert_with(|| new_category(&location, config));
        category.pages.push(file.clone());
        page.category = location.category_path.clone();

        let names = std::mem::take(&mut page.tags);
        for name in &names {
            push_unique(&mut page.tags, name);
        }
        for name in &page.tags {
            let ordinal = blog.taxonomy.tags.len() + 1;
            let tag = blog
                .taxonomy
                .tags
                .entry(name.clone())
                .or_insert_with(|| new_tag(name, ordinal, config));
            tag.pages.push(file.clone());
            push_unique(&mut tag.related, &location.category_path);
            push_unique(&mut category.related, name);
        }

        blog.pages.insert(file.clone(), page);
    }

    for tag in blog.taxonomy.tags.values_mut() {
        sort_by_date(&mut tag.pages, &blog.pages);
    }
    for category in blog.taxonomy.categories.values_mut() {
        if !category.is_root() {
            sort_by_date(&mut category.pages, &blog.pages);
        }
    }

    blog.feeds = feed::assemble(&blog.pages, &config.feeds, now);

    let published: HashMap<String, String> = blog
        .pages
        .keys()
        .map(|path| (paths::output_path(path), path.clone()))
        .collect();
    attach_index_pages(&mut blog, &published);
    check_generated_outputs(&blog, published)?;

    Ok(blog)
}

/// Mark categories whose index path is published by a page.
fn attach_index_pages(blog: &mut BlogStructure, published: &HashMap<String, String>) {
    for category in blog.taxonomy.categories.values_mut() {
        if category.is_root() {
            continue;
        }
        if let Some(page) = published.get(&category.index_output()) {
            debug!("{page}: stands in for the {} listing", category.path);
            category.index_page = Some(page.clone());
        }
    }
}

/// Every generated output must have a path of its own.
///
/// `claimed` starts as the published page outputs, keyed by output path.
fn check_generated_outputs(
    blog: &BlogStructure,
    mut claimed: HashMap<String, String>,
) -> Result<(), IndexError> {
    let categories = blog
        .taxonomy
        .categories
        .values()
        .filter(|c| c.has_listing())
        .map(|c| (c.index_output(), format!("category {}", c.path)));
    let tags = blog
        .taxonomy
        .tags
        .iter()
        .map(|(name, tag)| (tag.index_output(), format!("tag {name}")));
    let feeds = blog
        .feeds
        .iter()
        .map(|(kind, feed)| (feed.output(), format!("{kind} feed")));

    for (output, owner) in categories.chain(tags).chain(feeds) {
        if let Some(first) = claimed.get(&output) {
            return Err(IndexError::PathCollision {
                first: first.clone(),
                second: owner,
                output,
            });
        }
        claimed.insert(output, owner);
    }
    Ok(())
}

fn new_category(location: &PageLocation, config: &SiteConfig) -> Category {
    let overrides = config.categories.get(&location.category_path);
    let name = overrides
        .and_then(|o| o.name.clone())
        .unwrap_or_else(|| location.category_name.clone());
    let extra = overrides
        .map(|o| config::table_to_json(&o.extra))
        .unwrap_or_default()
        .into_iter()
        .filter(|(key, _)| !CATEGORY_RESERVED.contains(&key.as_str()))
        .collect();

    Category {
        name,
        slug: location.category_name.clone(),
        path: location.category_path.clone(),
        url: format!("/{}", location.category_path),
        pages: Vec::new(),
        related: Vec::new(),
        index_page: None,
        extra,
    }
}

/// `ordinal` is the tag's 1-based creation order, used for names with no
/// ASCII slug.
fn new_tag(name: &str, ordinal: usize, config: &SiteConfig) -> Tag {
    let overrides = config.tags.get(name);
    let slug = overrides
        .and_then(|o| o.slug.clone())
        .unwrap_or_else(|| sanitize_slug(name));
    let slug = if slug.is_empty() {
        format!("tag-{ordinal}")
    } else {
        slug
    };
    let extra = overrides
        .map(|o| config::table_to_json(&o.extra))
        .unwrap_or_default()
        .into_iter()
        .filter(|(key, _)| !TAG_RESERVED.contains(&key.as_str()))
        .collect();

    Tag {
        title: name.to_string(),
        url: format!("/{slug}"),
        slug,
        pages: Vec::new(),
        related: Vec::new(),
        extra,
    }
}
