//! Directory-per-page path mapping.
//!
//! Every publishable file resolves to an `index.<ext>` inside its own
//! directory, so pages get extensionless, trailing-slash URLs:
//!
//! ```text
//! posts/hello.md      → posts/hello/index.md
//! posts/posts.md      → posts/index.md        (the category's own page)
//! posts/index.md      → posts/index.md
//! ```
//!
//! Logical paths are content-root relative and always use `/` as separator,
//! independent of the host platform. All functions here are pure.

/// Extensions recognized as content pages. Everything else is an asset.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "adoc", "asciidoc", "html"];

/// Index document basename for rendered HTML output.
pub const INDEX_DOCUMENT: &str = "index.html";

const INDEX_STEM: &str = "index";

/// Parent directory of a logical path (`""` at the root).
pub fn dirname(path: &str) -> &str {
    path.rfind('/').map(|pos| &path[..pos]).unwrap_or("")
}

/// Final component of a logical path.
pub fn basename(path: &str) -> &str {
    path.rfind('/').map(|pos| &path[pos + 1..]).unwrap_or(path)
}

/// Split a basename into stem and extension, the extension keeping its dot.
///
/// A leading dot is part of the stem (`.hidden` has no extension).
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Join two logical path fragments, skipping empty ones.
pub fn join(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}/{child}"),
    }
}

/// Resolve `.` and `..` components of a logical path.
///
/// `..` components that climb above the start are kept.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." if parts.last().is_some_and(|last| *last != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Path of `target` as seen from the directory `from_dir`.
///
/// Both are content-root relative. Shared leading components are dropped;
/// every remaining component of `from_dir` becomes a `..`.
pub fn relative_to(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|c| !c.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|c| !c.is_empty()).collect();
    let shared = from
        .iter()
        .zip(&to)
        .take(to.len().saturating_sub(1))
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - shared];
    parts.extend(&to[shared..]);
    parts.join("/")
}

/// Whether the file is a content page, judged by extension.
pub fn is_content_file(path: &str) -> bool {
    let (_, ext) = split_extension(basename(path));
    let ext = ext.trim_start_matches('.');
    CONTENT_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Map a logical content path to its directory-per-page location.
///
/// Idempotent: canonical paths always end in `index.<ext>`, which maps to
/// itself.
pub fn canonicalize(path: &str) -> String {
    let (name, ext) = split_extension(basename(path));
    if name == INDEX_STEM {
        return path.to_string();
    }

    let parent = dirname(path);
    let (parent_name, _) = split_extension(basename(parent));
    let index = format!("{INDEX_STEM}{ext}");

    if name == parent_name {
        join(parent, &index)
    } else {
        join(&join(parent, name), &index)
    }
}

/// Drop the index document from a rendered link so it points at the directory.
///
/// `posts/hello/index.html` → `posts/hello`; a top-level `index.html`
/// becomes `.`. Links to anything else are returned unchanged.
pub fn adjust_output_link(link: &str, index_document: &str) -> String {
    if basename(link) != index_document {
        return link.to_string();
    }
    match dirname(link) {
        "" => ".".to_string(),
        dir => dir.to_string(),
    }
}

/// Where a logical path lands in the output tree.
///
/// Content pages become HTML and are canonicalized; assets keep their path.
pub fn output_path(path: &str) -> String {
    if !is_content_file(path) {
        return path.to_string();
    }
    let (stem, _) = split_extension(basename(path));
    let html = join(dirname(path), &format!("{stem}.html"));
    canonicalize(&html)
}

/// Taxonomy coordinates of a content page, derived from its canonical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Directory the page publishes into (`posts/hello`).
    pub publish_dir: String,
    /// Category key: the publish directory minus its final component.
    pub category_path: String,
    /// Basename of the category path (`""` for the root category).
    pub category_name: String,
    /// Final component of the publish directory.
    pub slug: String,
}

impl PageLocation {
    pub fn of(path: &str) -> Self {
        let canonical = canonicalize(path);
        let publish_dir = dirname(&canonical).to_string();
        let category_path = dirname(&publish_dir).to_string();
        Self {
            category_name: basename(&category_path).to_string(),
            slug: basename(&publish_dir).to_string(),
            category_path,
            publish_dir,
        }
    }

    /// Absolute URL of the page: its publish directory.
    pub fn url(&self) -> String {
        format!("/{}", self.publish_dir)
    }
}
