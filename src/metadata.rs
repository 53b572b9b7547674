//! Typed page metadata merge.
//!
//! A page is assembled from three layers, lowest to highest precedence:
//!
//! ```text
//! PageDefaults   title = slug, draft = false, publish = true, tags = []
//!      ↓
//! Attributes     whatever the front matter says (known keys are typed,
//!      ↓         unknown keys land in `Page::extra`)
//! PageIdentity   slug, path, url: computed, never overridable
//! ```
//!
//! Identity is applied structurally: [`Page`] only accepts it through its
//! constructor and exposes no setter, and the attribute layer drops any key
//! that names an identity field.
//!
//! Values are coerced leniently. A `title` given as a number becomes its
//! string form, `tags` may be a list or a comma-separated string, and a
//! `date` that cannot be parsed is treated as absent (with a warning) rather
//! than failing the build.

use crate::frontmatter::Attributes;
use crate::types::{Page, PageIdentity};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

/// Keys computed by the indexer. Front matter cannot set them.
const RESERVED_KEYS: &[&str] = &["slug", "path", "url", "category", "content"];

/// Layout variants accepted for `date` after RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Built-in values every page starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDefaults {
    pub title: String,
    pub draft: bool,
    pub publish: bool,
    pub tags: Vec<String>,
}

impl PageDefaults {
    /// Defaults for a page whose slug is `slug`: the title falls back to it.
    pub fn for_slug(slug: &str) -> Self {
        Self {
            title: slug.to_string(),
            draft: false,
            publish: true,
            tags: Vec::new(),
        }
    }
}

/// Merge the three layers into a [`Page`].
///
/// The returned page has no category yet; the indexer assigns it.
pub fn merge_page(defaults: PageDefaults, mut attributes: Attributes, identity: PageIdentity) -> Page {
    for key in RESERVED_KEYS {
        attributes.remove(*key);
    }

    let title = attributes
        .remove("title")
        .and_then(|v| scalar_string(&v, &identity.path, "title"));
    let draft = attributes
        .remove("draft")
        .and_then(|v| boolean(&v, &identity.path, "draft"));
    let publish = attributes
        .remove("publish")
        .and_then(|v| boolean(&v, &identity.path, "publish"));
    let tags = attributes.remove("tags").map(|v| tag_list(&v));
    let date = attributes
        .remove("date")
        .and_then(|v| date_value(&v, &identity.path));

    let mut page = Page::new(identity);
    page.title = resolve(&[title.as_deref(), Some(defaults.title.as_str())]).unwrap_or_default();
    page.draft = draft.unwrap_or(defaults.draft);
    page.publish = publish.unwrap_or(defaults.publish);
    page.tags = tags.unwrap_or(defaults.tags);
    page.date = date;
    page.extra = attributes.into_iter().collect();
    page
}

/// Resolve a field from multiple sources.
///
/// Takes optional values in priority order and returns the first
/// non-None, non-blank value, trimmed.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

fn scalar_string(value: &Value, path: &str, key: &str) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => {
            warn!("{path}: ignoring non-scalar {key}: {other}");
            None
        }
    }
}

fn boolean(value: &Value, path: &str, key: &str) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        Value::Null => None,
        other => {
            warn!("{path}: ignoring non-boolean {key}: {other}");
            None
        }
    }
}

/// Tag names from a YAML list or a comma-separated string.
fn tag_list(value: &Value) -> Vec<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(String::from).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn date_value(value: &Value, path: &str) -> Option<DateTime<Utc>> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    let parsed = parse_date(&text);
    if parsed.is_none() {
        warn!("{path}: unparseable date {text:?}, treating page as undated");
    }
    parsed
}

/// Parse a front matter date.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM:SS` (UTC)
/// and bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

const MAX_SLUG_LEN: usize = 80;

/// Sanitize a name for use in URLs and directory names.
///
/// - Replaces non-alphanumeric characters (except dashes) with dashes
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn sanitize_slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(slug.len());
    let mut prev_dash = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::attributes;
    use chrono::TimeZone;

    fn identity() -> PageIdentity {
        PageIdentity {
            slug: "hello".into(),
            path: "posts/hello.md".into(),
            url: "/posts/hello".into(),
        }
    }

    // =========================================================================
    // merge_page precedence
    // =========================================================================

    #[test]
    fn defaults_apply_without_attributes() {
        let page = merge_page(PageDefaults::for_slug("hello"), Attributes::new(), identity());
        assert_eq!(page.title, "hello");
        assert!(!page.draft);
        assert!(page.publish);
        assert!(page.tags.is_empty());
        assert_eq!(page.date, None);
        assert!(page.extra.is_empty());
    }

    #[test]
    fn attributes_override_defaults() {
        let attrs = attributes("title: Hi there\ndraft: true\npublish: false\ntags: [a, b]");
        let page = merge_page(PageDefaults::for_slug("hello"), attrs, identity());
        assert_eq!(page.title, "Hi there");
        assert!(page.draft);
        assert!(!page.publish);
        assert_eq!(page.tags, vec!["a", "b"]);
    }

    #[test]
    fn identity_beats_attributes() {
        let attrs = attributes("slug: evil\npath: other.md\nurl: /hijack\ncategory: x");
        let page = merge_page(PageDefaults::for_slug("hello"), attrs, identity());
        assert_eq!(page.slug(), "hello");
        assert_eq!(page.path(), "posts/hello.md");
        assert_eq!(page.url(), "/posts/hello");
        assert!(page.extra.is_empty(), "reserved keys must not leak into extra");
    }

    #[test]
    fn unknown_keys_go_to_extra() {
        let attrs = attributes("image: cover.png\nauthor:\n  name: Ann");
        let page = merge_page(PageDefaults::for_slug("hello"), attrs, identity());
        assert_eq!(page.extra["image"], "cover.png");
        assert_eq!(page.extra["author"]["name"], "Ann");
    }

    #[test]
    fn blank_title_falls_back_to_slug() {
        let page = merge_page(
            PageDefaults::for_slug("hello"),
            attributes("title: '   '"),
            identity(),
        );
        assert_eq!(page.title, "hello");
    }

    #[test]
    fn numeric_title_is_stringified() {
        let page = merge_page(PageDefaults::for_slug("hello"), attributes("title: 1984"), identity());
        assert_eq!(page.title, "1984");
    }

    #[test]
    fn wrongly_typed_flags_keep_defaults() {
        let page = merge_page(
            PageDefaults::for_slug("hello"),
            attributes("draft: [1]\npublish: 3"),
            identity(),
        );
        assert!(!page.draft);
        assert!(page.publish);
    }

    #[test]
    fn comma_separated_tags() {
        let page = merge_page(
            PageDefaults::for_slug("hello"),
            attributes("tags: 'rust, web ,,  cli'"),
            identity(),
        );
        assert_eq!(page.tags, vec!["rust", "web", "cli"]);
    }

    #[test]
    fn date_is_parsed_and_bad_date_is_absent() {
        let page = merge_page(
            PageDefaults::for_slug("hello"),
            attributes("date: 2016-01-02"),
            identity(),
        );
        assert_eq!(page.date, Some(Utc.with_ymd_and_hms(2016, 1, 2, 0, 0, 0).unwrap()));

        let page = merge_page(
            PageDefaults::for_slug("hello"),
            attributes("date: someday"),
            identity(),
        );
        assert_eq!(page.date, None);
    }

    // =========================================================================
    // parse_date
    // =========================================================================

    #[test]
    fn parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
        assert_eq!(parse_date("2020-05-17T08:30:00Z"), Some(expected));
        assert_eq!(parse_date("2020-05-17T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_date("2020-05-17 08:30:00"), Some(expected));
        assert_eq!(parse_date("2020-05-17 08:30"), Some(expected));
        assert_eq!(parse_date("2020-05-17T08:30:00"), Some(expected));
        assert_eq!(parse_date("May 17"), None);
    }

    // =========================================================================
    // resolve / sanitize_slug
    // =========================================================================

    #[test]
    fn resolve_picks_first_non_blank() {
        assert_eq!(resolve(&[None, Some("  "), Some(" b ")]), Some("b".into()));
        assert_eq!(resolve(&[]), None);
    }

    #[test]
    fn sanitize_slug_replaces_and_lowercases() {
        assert_eq!(sanitize_slug("Rust & WebAssembly"), "rust-webassembly");
        assert_eq!(sanitize_slug("--a--b--"), "a-b");
        assert_eq!(sanitize_slug("!!!"), "");
    }

    #[test]
    fn sanitize_slug_truncates_at_word_boundary() {
        let long = "word-".repeat(30);
        let slug = sanitize_slug(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
