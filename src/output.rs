//! Console output formatting for the indexed structure and build results.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entity leads
//! with its position and title; output paths follow an arrow as secondary
//! context.
//!
//! # Output Format
//!
//! ## Structure
//!
//! ```text
//! Categories
//! 001 (root) (1 pages)
//!     1.1 About → about/index.html
//! 002 Posts (2 pages) → posts/index.html
//!     2.1 Second → posts/second/index.html
//!     2.2 First → posts/first/index.html
//!
//! Tags
//! 001 rust (1 pages) → rust/index.html
//!
//! Feeds
//!     rss (2 pages) → feed.xml
//! ```
//!
//! ## Report
//!
//! ```text
//! Generated 3 pages, 1 category indices, 1 tag indices, 1 feeds, 3 images
//! Failed
//!     page posts/broken.md: template error: ...
//!     image cover.jpg for posts/first.md: IO error: ...
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::navigation::Navigation;
use crate::paths;
use crate::site::BuildReport;
use crate::types::BlogStructure;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title + page count.
///
/// ```text
/// 001 Posts (5 pages)
/// ```
fn entity_header(index: usize, title: &str, pages: usize) -> String {
    format!("{} {} ({} pages)", format_index(index), title, pages)
}

// ============================================================================
// Structure
// ============================================================================

/// Format the indexed structure: categories with their pages, tags, feeds.
///
/// Pages show their navigation level; pages missing from `navigation` show
/// `-` instead.
pub fn format_structure(blog: &BlogStructure, navigation: &Navigation) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Categories".to_string());
    for (i, category) in blog.taxonomy.categories.values().enumerate() {
        let title = if category.is_root() {
            "(root)"
        } else {
            category.name.as_str()
        };
        let header = entity_header(i + 1, title, category.pages.len());
        if category.has_listing() {
            lines.push(format!("{header} \u{2192} {}", category.index_output()));
        } else {
            lines.push(header);
        }
        for page in blog.pages_of(&category.pages) {
            let level = navigation
                .get(page.path())
                .map(|entry| entry.level.as_str())
                .unwrap_or("-");
            lines.push(format!(
                "{}{} {} \u{2192} {}",
                indent(1),
                level,
                page.title,
                paths::output_path(page.path())
            ));
        }
    }

    if !blog.taxonomy.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (i, tag) in blog.taxonomy.tags.values().enumerate() {
            lines.push(format!(
                "{} \u{2192} {}",
                entity_header(i + 1, &tag.title, tag.pages.len()),
                tag.index_output()
            ));
        }
    }

    if !blog.feeds.is_empty() {
        lines.push(String::new());
        lines.push("Feeds".to_string());
        for (kind, feed) in &blog.feeds {
            lines.push(format!(
                "{}{} ({} pages) \u{2192} {}",
                indent(1),
                kind,
                feed.pages.len(),
                feed.url
            ));
        }
    }

    lines
}

/// Print the structure to stdout.
pub fn print_structure(blog: &BlogStructure, navigation: &Navigation) {
    for line in format_structure(blog, navigation) {
        println!("{}", line);
    }
}

// ============================================================================
// Build report
// ============================================================================

/// Format a build report: totals, then one line per failure.
pub fn format_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Generated {} pages, {} category indices, {} tag indices, {} feeds, {} images",
        report.pages.len(),
        report.categories.len(),
        report.tags.len(),
        report.feeds.len(),
        report.images.generated.len()
    )];

    if !report.is_success() {
        lines.push("Failed".to_string());
        for failure in &report.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.unit, failure.error));
        }
        for failure in &report.images.failures {
            lines.push(format!(
                "{}image {} for {}: {}",
                indent(1),
                failure.transform.original_path,
                failure.transform.base_path,
                failure.error
            ));
        }
    }

    lines
}

/// Print a build report to stdout.
pub fn print_report(report: &BuildReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{BackendError, ImageTransform, TransformFailure, TransformMode};
    use crate::navigation::build_navigation;
    use crate::render::RenderError;
    use crate::site::{Unit, UnitFailure};
    use crate::test_helpers::structure_with;
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn entity_header_counts_pages() {
        assert_eq!(entity_header(2, "Posts", 5), "002 Posts (5 pages)");
    }

    // =========================================================================
    // Structure
    // =========================================================================

    #[test]
    fn structure_lists_categories_tags_and_feeds() {
        let config = toml::from_str("[feeds]\nrss = \"feed.xml\"\n").unwrap();
        let blog = structure_with(
            &[
                ("about.md", "title: About"),
                ("posts/first.md", "title: First\ndate: 2024-01-01\ntags: [rust]"),
                ("posts/second.md", "title: Second\ndate: 2024-02-01"),
            ],
            &config,
        );
        let lines = format_structure(&blog, &build_navigation(&blog));

        assert_eq!(
            lines,
            vec![
                "Categories",
                "001 (root) (1 pages)",
                "    1.1 About \u{2192} about/index.html",
                "002 posts (2 pages) \u{2192} posts/index.html",
                "    2.1 Second \u{2192} posts/second/index.html",
                "    2.2 First \u{2192} posts/first/index.html",
                "",
                "Tags",
                "001 rust (1 pages) \u{2192} rust/index.html",
                "",
                "Feeds",
                "    rss (2 pages) \u{2192} feed.xml",
            ]
        );
    }

    #[test]
    fn unnavigated_pages_show_dash() {
        let blog = structure_with(&[("a.md", "title: A")], &Default::default());
        let lines = format_structure(&blog, &Navigation::new());
        assert_eq!(lines[2], "    - A \u{2192} a/index.html");
    }

    // =========================================================================
    // Report
    // =========================================================================

    #[test]
    fn successful_report_is_one_line() {
        let report = BuildReport {
            pages: vec!["a/index.html".into(), "b/index.html".into()],
            feeds: vec!["feed.xml".into()],
            ..BuildReport::default()
        };
        assert_eq!(
            format_report(&report),
            vec!["Generated 2 pages, 0 category indices, 0 tag indices, 1 feeds, 0 images"]
        );
    }

    #[test]
    fn failures_are_listed() {
        let mut report = BuildReport::default();
        report.failures.push(UnitFailure {
            unit: Unit::Page("posts/broken.md".into()),
            error: RenderError::Template("bad format".into()),
        });
        report.images.generated.push(PathBuf::from("/out/a-fit-1-1.jpg"));
        report.images.failures.push(TransformFailure {
            transform: ImageTransform {
                mode: TransformMode::Fit,
                base_path: "posts/first.md".into(),
                original_path: "cover.jpg".into(),
                derived_path: "cover-fit-1-1.jpg".into(),
                width: 1,
                height: 1,
            },
            error: BackendError::ProcessingFailed("decode".into()),
        });

        let lines = format_report(&report);
        assert_eq!(lines[0], "Generated 0 pages, 0 category indices, 0 tag indices, 0 feeds, 1 images");
        assert_eq!(lines[1], "Failed");
        assert_eq!(lines[2], "    page posts/broken.md: template error: bad format");
        assert_eq!(
            lines[3],
            "    image cover.jpg for posts/first.md: Processing failed: decode"
        );
    }
}
