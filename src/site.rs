//! Build driver: sequences every phase of a site build.
//!
//! ```text
//! discover ─▶ index ─▶ navigation + summary ─▶ copy assets
//!     ─▶ render pages ─▶ category indices ─▶ tag indices ─▶ feeds
//!     ─▶ drain image queue
//! ```
//!
//! Discovery, indexing and asset copying are fatal on error: nothing is
//! rendered from a broken structure. Rendering runs on a rayon pool sized by
//! `processing.max_processes`; each unit (one page, one index, one feed)
//! succeeds or fails on its own and failures are collected in the
//! [`BuildReport`]. Every unit returns its [`ImageRecorder`], and the queue
//! built from them is drained once, after the last unit has written its
//! output.

use crate::config::{self, ConfigError, SiteConfig};
use crate::frontmatter::{self, FileMetadata};
use crate::highlight::{Highlighter, SyntectHighlighter};
use crate::imaging::{DrainReport, ImageBackend, ImageRecorder, Quality, RustBackend, TransformQueue};
use crate::index::{self, IndexError};
use crate::navigation::{self, Navigation, Summary};
use crate::paths;
use crate::render::{self, HtmlRenderer, RenderContext, RenderError, Renderer};
use crate::rewrite;
use crate::types::{BlogStructure, Page};
use chrono::Utc;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Discovery failed: {0}")]
    Discover(#[from] walkdir::Error),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Files never treated as content or assets.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Read-only state shared by every render unit.
pub struct BuildContext<'a> {
    pub structure: BlogStructure,
    pub navigation: Navigation,
    pub summary: Summary,
    pub config: &'a SiteConfig,
}

impl<'a> BuildContext<'a> {
    pub fn new(structure: BlogStructure, config: &'a SiteConfig) -> Self {
        Self {
            navigation: navigation::build_navigation(&structure),
            summary: navigation::build_summary(&structure),
            structure,
            config,
        }
    }

    pub fn render_context<'b, T>(&'b self, this: &'b T, base_path: &'b str) -> RenderContext<'b, T> {
        RenderContext {
            this,
            blog: &self.structure,
            navigation: &self.navigation,
            summary: &self.summary,
            base_path,
        }
    }
}

/// One independently rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// Keyed by logical page path.
    Page(String),
    /// Keyed by category path.
    Category(String),
    /// Keyed by tag name.
    Tag(String),
    /// Keyed by feed type.
    Feed(String),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Page(path) => write!(f, "page {path}"),
            Unit::Category(path) => write!(f, "category {path}"),
            Unit::Tag(name) => write!(f, "tag {name}"),
            Unit::Feed(kind) => write!(f, "feed {kind}"),
        }
    }
}

#[derive(Debug)]
pub struct UnitFailure {
    pub unit: Unit,
    pub error: RenderError,
}

/// What a build wrote, and what it could not.
///
/// Output lists hold output-root relative paths in structure order.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub feeds: Vec<String>,
    pub images: DrainReport,
    pub failures: Vec<UnitFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.images.is_success()
    }
}

type UnitResult = Result<(String, ImageRecorder), UnitFailure>;

// ============================================================================
// Discovery
// ============================================================================

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Content-root relative `/`-separated form of a path below `root`.
fn logical_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// List every file below `root` as a logical path, in sorted walk order.
///
/// Hidden files and directories, the configuration file and OS clutter are
/// skipped.
pub fn discover(root: &Path) -> Result<Vec<String>, walkdir::Error> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if IGNORED_FILES.contains(&name.as_ref()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let logical = logical_path(relative);
        if logical != config::CONFIG_FILE {
            files.push(logical);
        }
    }
    Ok(files)
}

// ============================================================================
// Build
// ============================================================================

/// Build with the stock renderer and image backend, reading `folio.toml`
/// from the content root.
pub fn build_site(source_root: &Path, output_root: &Path) -> Result<BuildReport, BuildError> {
    let config = config::load_config(source_root)?;
    build(
        source_root,
        output_root,
        &config,
        &HtmlRenderer::new(),
        &RustBackend::new(),
    )
}

/// Build the site in `source_root` into `output_root`.
pub fn build(
    source_root: &Path,
    output_root: &Path,
    config: &SiteConfig,
    renderer: &(impl Renderer + ?Sized),
    backend: &(impl ImageBackend + ?Sized),
) -> Result<BuildReport, BuildError> {
    let mut files = discover(source_root)?;
    if let Some(nested) = nested_output(source_root, output_root) {
        let prefix = format!("{nested}/");
        files.retain(|f| !f.starts_with(&prefix));
    }

    let structure = index::build(&files, &FileMetadata::new(source_root), config, Utc::now())?;
    info!(
        "indexed {} pages, {} categories, {} tags",
        structure.pages.len(),
        structure.taxonomy.categories.len(),
        structure.taxonomy.tags.len()
    );
    let ctx = BuildContext::new(structure, config);

    fs::create_dir_all(output_root)?;
    copy_assets(source_root, output_root, &files)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_threads(&config.processing))
        .build()?;
    let highlighter = SyntectHighlighter::new();

    let report = pool.install(|| {
        let mut report = BuildReport::default();
        let mut queue = TransformQueue::new();

        let pages: Vec<&Page> = ctx.structure.pages.values().collect();
        let results = pages
            .par_iter()
            .map(|page| {
                render_page(&ctx, page, source_root, output_root, renderer, &highlighter).map_err(
                    |error| UnitFailure {
                        unit: Unit::Page(page.path().to_string()),
                        error,
                    },
                )
            })
            .collect();
        collect(results, &mut report.pages, &mut report.failures, &mut queue);

        let categories: Vec<_> = ctx
            .structure
            .taxonomy
            .categories
            .values()
            .filter(|c| c.has_listing())
            .collect();
        let results = categories
            .par_iter()
            .map(|category| {
                let output = category.index_output();
                info!("category index for {}", category.path);
                render_unit(output_root, &output, |recorder| {
                    renderer.render_category(&ctx.render_context(*category, &output), recorder)
                })
                .map_err(|error| UnitFailure {
                    unit: Unit::Category(category.path.clone()),
                    error,
                })
            })
            .collect();
        collect(results, &mut report.categories, &mut report.failures, &mut queue);

        let tags: Vec<_> = ctx.structure.taxonomy.tags.iter().collect();
        let results = tags
            .par_iter()
            .map(|(name, tag)| {
                let output = tag.index_output();
                info!("tag index for {name}");
                render_unit(output_root, &output, |recorder| {
                    renderer.render_tag(&ctx.render_context(*tag, &output), recorder)
                })
                .map_err(|error| UnitFailure {
                    unit: Unit::Tag(name.to_string()),
                    error,
                })
            })
            .collect();
        collect(results, &mut report.tags, &mut report.failures, &mut queue);

        let feeds: Vec<_> = ctx.structure.feeds.iter().collect();
        let results = feeds
            .par_iter()
            .map(|(kind, feed)| {
                let output = feed.output();
                info!("{kind} feed at {output}");
                render_unit(output_root, &output, |recorder| {
                    renderer.render_feed(kind, &ctx.render_context(*feed, &output), recorder)
                })
                .map_err(|error| UnitFailure {
                    unit: Unit::Feed(kind.to_string()),
                    error,
                })
            })
            .collect();
        collect(results, &mut report.feeds, &mut report.failures, &mut queue);

        info!("draining {} image transforms", queue.len());
        report.images = queue.drain(
            backend,
            output_root,
            paths::output_path,
            Quality::new(config.images.quality),
        );
        report
    });

    Ok(report)
}

/// The output root as a logical path below the source root, if it is one.
fn nested_output(source_root: &Path, output_root: &Path) -> Option<String> {
    let relative = output_root.strip_prefix(source_root).ok()?;
    let logical = logical_path(relative);
    (!logical.is_empty()).then_some(logical)
}

/// Copy non-content files verbatim, so image originals exist in the output.
fn copy_assets(source_root: &Path, output_root: &Path, files: &[String]) -> std::io::Result<()> {
    for file in files.iter().filter(|f| !paths::is_content_file(f)) {
        let target = output_root.join(file);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source_root.join(file), &target)?;
        debug!("copied {file}");
    }
    Ok(())
}

fn render_page(
    ctx: &BuildContext<'_>,
    page: &Page,
    source_root: &Path,
    output_root: &Path,
    renderer: &(impl Renderer + ?Sized),
    highlighter: &(impl Highlighter + ?Sized),
) -> Result<(String, ImageRecorder), RenderError> {
    let raw = fs::read_to_string(source_root.join(page.path()))?;
    let output = paths::output_path(page.path());
    info!("generating {output}");

    let mut sections = render::body_sections(page.path(), frontmatter::strip_header(&raw));
    rewrite::adjust_page(&mut sections, page.path(), &output, highlighter)?;

    let mut page = page.clone();
    page.content = rewrite::combine_content(&sections);
    render_unit(output_root, &output, |recorder| {
        renderer.render_page(&ctx.render_context(&page, page.path()), recorder)
    })
}

/// Render one unit with a fresh recorder and write it to `output`.
fn render_unit(
    output_root: &Path,
    output: &str,
    render: impl FnOnce(&mut ImageRecorder) -> Result<String, RenderError>,
) -> Result<(String, ImageRecorder), RenderError> {
    let mut recorder = ImageRecorder::new();
    let document = render(&mut recorder)?;
    let target = output_root.join(output);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, document)?;
    Ok((output.to_string(), recorder))
}

fn collect(
    results: Vec<UnitResult>,
    written: &mut Vec<String>,
    failures: &mut Vec<UnitFailure>,
    queue: &mut TransformQueue,
) {
    for result in results {
        match result {
            Ok((output, recorder)) => {
                written.push(output);
                queue.extend(recorder);
            }
            Err(failure) => {
                warn!("{} failed: {}", failure.unit, failure.error);
                failures.push(failure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::types::{Category, Feed, Tag};
    use crate::test_helpers::write_tree;
    use tempfile::TempDir;

    /// Stock renderer that fails on chosen pages.
    struct Flaky {
        inner: HtmlRenderer,
        failing: &'static str,
    }

    impl Renderer for Flaky {
        fn render_page(
            &self,
            ctx: &RenderContext<'_, Page>,
            recorder: &mut ImageRecorder,
        ) -> Result<String, RenderError> {
            if ctx.this.path() == self.failing {
                return Err(RenderError::Template("boom".into()));
            }
            self.inner.render_page(ctx, recorder)
        }

        fn render_category(
            &self,
            ctx: &RenderContext<'_, Category>,
            recorder: &mut ImageRecorder,
        ) -> Result<String, RenderError> {
            self.inner.render_category(ctx, recorder)
        }

        fn render_tag(
            &self,
            ctx: &RenderContext<'_, Tag>,
            recorder: &mut ImageRecorder,
        ) -> Result<String, RenderError> {
            self.inner.render_tag(ctx, recorder)
        }

        fn render_feed(
            &self,
            kind: &str,
            ctx: &RenderContext<'_, Feed>,
            recorder: &mut ImageRecorder,
        ) -> Result<String, RenderError> {
            self.inner.render_feed(kind, ctx, recorder)
        }
    }

    fn site(root: &Path) {
        write_tree(
            root,
            &[
                ("folio.toml", "title = \"Test\"\n[feeds]\nrss = \"feed.xml\"\n"),
                ("about.md", "---\ntitle: About\n---\nHello.\n"),
                (
                    "posts/first.md",
                    "---\ntitle: First\ndate: 2024-01-01\ntags: [rust]\nimage: pic.jpg\n---\n[Up](other.md)\n",
                ),
                ("posts/second.md", "---\ntitle: Second\ndate: 2024-02-01\n---\nBody\n"),
                ("posts/draft.md", "---\ndraft: true\n---\nSecret\n"),
                ("posts/pic.jpg", "not really an image"),
                (".git/HEAD", "ref"),
                (".hidden.md", "hidden"),
            ],
        );
    }

    #[test]
    fn discover_skips_hidden_and_config() {
        let tmp = TempDir::new().unwrap();
        site(tmp.path());
        let files = discover(tmp.path()).unwrap();
        assert_eq!(
            files,
            vec![
                "about.md",
                "posts/draft.md",
                "posts/first.md",
                "posts/pic.jpg",
                "posts/second.md",
            ]
        );
    }

    #[test]
    fn nested_output_is_detected() {
        assert_eq!(
            nested_output(Path::new("/site"), Path::new("/site/_out")),
            Some("_out".to_string())
        );
        assert_eq!(nested_output(Path::new("/site"), Path::new("/out")), None);
        assert_eq!(nested_output(Path::new("/site"), Path::new("/site")), None);
    }

    #[test]
    fn build_writes_every_unit() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        site(&source);
        let config = config::load_config(&source).unwrap();

        let backend = MockBackend::new();
        let report = build(&source, &output, &config, &HtmlRenderer::new(), &backend).unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(
            report.pages,
            vec!["about/index.html", "posts/first/index.html", "posts/second/index.html"]
        );
        assert_eq!(report.categories, vec!["posts/index.html"]);
        assert_eq!(report.tags, vec!["rust/index.html"]);
        assert_eq!(report.feeds, vec!["feed.xml"]);
        assert!(output.join("posts/pic.jpg").exists());
        assert!(!output.join("posts/draft/index.html").exists());

        let first = fs::read_to_string(output.join("posts/first/index.html")).unwrap();
        assert!(first.contains(r#"href="../other.md""#));

        // page hero plus one thumbnail shared by the category and tag indices
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(
            op,
            RecordedOp::Transform { source, .. } if source.ends_with("pic.jpg")
        )));
    }

    #[test]
    fn failing_unit_does_not_stop_siblings() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        site(&source);
        let config = config::load_config(&source).unwrap();
        let renderer = Flaky {
            inner: HtmlRenderer::new(),
            failing: "posts/second.md",
        };

        let report = build(&source, &output, &config, &renderer, &MockBackend::new()).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].unit, Unit::Page("posts/second.md".into()));
        assert_eq!(report.pages, vec!["about/index.html", "posts/first/index.html"]);
        assert_eq!(report.categories.len(), 1);
        assert!(!output.join("posts/second/index.html").exists());
    }

    #[test]
    fn path_collision_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        write_tree(&source, &[("a/b.md", "x"), ("a/b.markdown", "y")]);

        let result = build(
            &source,
            &output,
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        );
        assert!(matches!(result, Err(BuildError::Index(IndexError::PathCollision { .. }))));
        assert!(!output.exists());
    }

    #[test]
    fn bare_ampersand_does_not_fail_the_page() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        write_tree(
            &source,
            &[("posts/legacy.html", "---\ntitle: Legacy\n---\n<p>Tom & Jerry</p><img src=\"a.png\">\n")],
        );

        let report = build(
            &source,
            &output,
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        )
        .unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        let html = fs::read_to_string(output.join("posts/legacy/index.html")).unwrap();
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains(r#"src="../a.png""#));
    }

    #[test]
    fn non_ascii_tag_keeps_the_home_page() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        write_tree(
            &source,
            &[
                ("index.md", "---\ntitle: Home\n---\nWelcome home\n"),
                ("posts/x.md", "---\ntitle: X\ntags: [日本語]\n---\nBody\n"),
            ],
        );

        let report = build(
            &source,
            &output,
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        )
        .unwrap();

        assert_eq!(report.tags, vec!["tag-1/index.html"]);
        let home = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(home.contains("Welcome home"));
    }

    #[test]
    fn tag_colliding_with_a_page_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        write_tree(
            &source,
            &[
                ("news.md", "---\ntitle: News\n---\nLatest\n"),
                ("posts/x.md", "---\ntags: [news]\n---\nBody\n"),
            ],
        );

        let result = build(
            &source,
            &output,
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        );
        assert!(matches!(result, Err(BuildError::Index(IndexError::PathCollision { .. }))));
        assert!(!output.exists());
    }

    #[test]
    fn category_page_replaces_the_listing() {
        let tmp = TempDir::new().unwrap();
        let (source, output) = (tmp.path().join("src"), tmp.path().join("out"));
        write_tree(
            &source,
            &[
                ("posts/posts.md", "---\ntitle: Posts\n---\nHand written index\n"),
                ("posts/a.md", "---\ntitle: A\n---\nBody\n"),
            ],
        );

        let report = build(
            &source,
            &output,
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        )
        .unwrap();

        assert!(report.categories.is_empty());
        assert_eq!(report.pages, vec!["posts/a/index.html", "posts/index.html"]);
        let index = fs::read_to_string(output.join("posts/index.html")).unwrap();
        assert!(index.contains("Hand written index"));
    }

    #[test]
    fn output_inside_source_is_not_reindexed() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("a.md", "A"), ("_site/old.md", "stale")]);

        let report = build(
            tmp.path(),
            &tmp.path().join("_site"),
            &SiteConfig::default(),
            &HtmlRenderer::new(),
            &MockBackend::new(),
        )
        .unwrap();
        assert_eq!(report.pages, vec!["a/index.html"]);
    }
}
