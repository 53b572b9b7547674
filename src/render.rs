//! Document rendering: pages, category and tag indices, feeds.
//!
//! The build driver hands each render unit a [`RenderContext`] (the unit
//! itself as `this`, the whole blog, navigation and summary) plus the
//! unit's own [`ImageRecorder`]. A [`Renderer`] turns that into the bytes of
//! one output file.
//!
//! [`HtmlRenderer`] is the stock implementation. HTML is generated with
//! [Maud](https://maud.lambda.xyz/), so every interpolation is escaped
//! unless wrapped in `PreEscaped`; page content is the one place that is,
//! because it is already markup. The `rss` feed type is rendered with the
//! `rss` crate.
//!
//! ## Template helpers
//!
//! | Helper | Effect |
//! |--------|--------|
//! | [`strftime`] | chrono format string, rejected up front when malformed |
//! | [`TemplateHelpers::image_fit`] | records a fit transform, returns the derived path |
//! | [`TemplateHelpers::image_fill`] | records a fill transform, returns the derived path |
//!
//! Image paths are relative to the unit's output directory, and so are the
//! derived paths handed back.

use crate::highlight::{HighlightError, SyntectHighlighter};
use crate::imaging::{ImageRecorder, TransformMode};
use crate::navigation::{Navigation, Summary};
use crate::paths;
use crate::rewrite::{self, RewriteError, Section};
use crate::types::{BlogStructure, Category, Feed, Page, SiteView, Tag};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("link rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),
    #[error("unsupported feed type: {0}")]
    UnsupportedFeed(String),
}

const CSS: &str = include_str!("../static/style.css");

/// Box of the fitted hero image on page documents.
pub const HERO_SIZE: (u32, u32) = (960, 540);
/// Box of the filled thumbnails on category and tag listings.
pub const THUMBNAIL_SIZE: (u32, u32) = (320, 180);

const DATE_FORMAT: &str = "%B %-d, %Y";

/// Front matter field naming a page's illustration.
const IMAGE_FIELD: &str = "image";

/// Everything one render unit may read.
pub struct RenderContext<'a, T> {
    /// The page, category, tag or feed being rendered.
    pub this: &'a T,
    pub blog: &'a BlogStructure,
    pub navigation: &'a Navigation,
    pub summary: &'a Summary,
    /// Logical path image transforms are recorded against.
    pub base_path: &'a str,
}

impl<'a, T> RenderContext<'a, T> {
    pub fn site(&self) -> SiteView<'a> {
        self.blog.site_view()
    }
}

/// Turns render units into output documents.
///
/// Called from the rayon pool, one unit per call, so implementations must be
/// `Sync`. Transforms requested while rendering go to `recorder`.
pub trait Renderer: Sync {
    fn render_page(
        &self,
        ctx: &RenderContext<'_, Page>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError>;

    fn render_category(
        &self,
        ctx: &RenderContext<'_, Category>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError>;

    fn render_tag(
        &self,
        ctx: &RenderContext<'_, Tag>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError>;

    /// `kind` is the feed's configured type, e.g. `rss`.
    fn render_feed(
        &self,
        kind: &str,
        ctx: &RenderContext<'_, Feed>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError>;
}

// ============================================================================
// Template helpers
// ============================================================================

/// Format a date with a chrono format string.
///
/// Malformed format strings are an error instead of a panic at display time.
pub fn strftime(date: &DateTime<Utc>, format: &str) -> Result<String, RenderError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(RenderError::Template(format!(
            "invalid date format {format:?}"
        )));
    }
    Ok(date.format_with_items(items.into_iter()).to_string())
}

/// Image helpers bound to one render unit.
pub struct TemplateHelpers<'a> {
    base_path: &'a str,
    recorder: &'a mut ImageRecorder,
}

impl<'a> TemplateHelpers<'a> {
    pub fn new(base_path: &'a str, recorder: &'a mut ImageRecorder) -> Self {
        Self {
            base_path,
            recorder,
        }
    }

    pub fn image_fit(&mut self, image: &str, width: u32, height: u32) -> String {
        self.recorder
            .record(self.base_path, image, width, height, TransformMode::Fit)
    }

    pub fn image_fill(&mut self, image: &str, width: u32, height: u32) -> String {
        self.recorder
            .record(self.base_path, image, width, height, TransformMode::Fill)
    }

    /// Output directory of the unit.
    fn base_dir(&self) -> String {
        paths::dirname(&paths::output_path(self.base_path)).to_string()
    }

    /// The page's `image` field as a derived variant seen from this unit.
    ///
    /// Relative images are authored next to the page source; they are
    /// located from the unit's output directory and transformed. Absolute
    /// and external images are used as they are.
    fn page_image(&mut self, page: &Page, mode: TransformMode, size: (u32, u32)) -> Option<String> {
        let image = page.extra_str(IMAGE_FIELD)?;
        if !rewrite::is_relative(image) {
            return Some(image.to_string());
        }
        let source = paths::join(paths::dirname(page.path()), image);
        let local = paths::relative_to(&self.base_dir(), &source);
        Some(match mode {
            TransformMode::Fit => self.image_fit(&local, size.0, size.1),
            TransformMode::Fill => self.image_fill(&local, size.0, size.1),
        })
    }
}

// ============================================================================
// Page bodies
// ============================================================================

/// Convert a page body to sections of markup.
///
/// `.html` bodies are already markup; everything else is Markdown.
pub fn body_sections(path: &str, body: &str) -> Vec<Section> {
    let (_, ext) = paths::split_extension(paths::basename(path));
    let markup = if ext.eq_ignore_ascii_case(".html") {
        body.to_string()
    } else {
        markdown_to_html(body)
    };
    vec![Section::normal(markup)]
}

pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header: site title plus one link per category index.
fn site_header(site: &SiteView<'_>, current_category: &str) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site.title) }
            nav.site-nav {
                ul {
                    @for category in site.categories.values().filter(|c| !c.is_root()) {
                        li class=[(category.path == current_category).then_some("current")] {
                            a href={ (category.url) "/" } { (category.name) }
                        }
                    }
                }
            }
        }
    }
}

fn document_title(title: &str, site: &SiteView<'_>) -> String {
    match (title.is_empty(), site.title.is_empty()) {
        (_, true) => title.to_string(),
        (true, false) => site.title.to_string(),
        (false, false) => format!("{title} · {}", site.title),
    }
}

fn tag_links(blog: &BlogStructure, names: &[String]) -> Markup {
    let tags: Vec<&Tag> = names
        .iter()
        .filter_map(|name| blog.taxonomy.tags.get(name))
        .collect();
    html! {
        @if !tags.is_empty() {
            ul.tags {
                @for tag in tags {
                    li { a href={ (tag.url) "/" } { (tag.title) } }
                }
            }
        }
    }
}

/// Previous and next page in table-of-contents order.
fn pager(ctx: &RenderContext<'_, Page>) -> Markup {
    let chapters = &ctx.summary.chapters;
    let position = chapters.iter().position(|c| c.path == ctx.this.path());
    let neighbour = |offset: isize| {
        position
            .and_then(|p| p.checked_add_signed(offset))
            .and_then(|p| chapters.get(p))
            .and_then(|c| ctx.blog.pages.get(&c.path))
    };
    let (previous, next) = (neighbour(-1), neighbour(1));
    html! {
        @if previous.is_some() || next.is_some() {
            nav.pager {
                @if let Some(page) = previous {
                    a rel="prev" href=(page.url()) { "← " (page.title) }
                }
                @if let Some(page) = next {
                    a rel="next" href=(page.url()) { (page.title) " →" }
                }
            }
        }
    }
}

/// A listing of pages with filled thumbnails.
fn listing<'p>(
    pages: impl Iterator<Item = &'p Page>,
    helpers: &mut TemplateHelpers<'_>,
) -> Result<Markup, RenderError> {
    let mut items = Vec::new();
    for page in pages {
        let thumbnail = helpers.page_image(page, TransformMode::Fill, THUMBNAIL_SIZE);
        let date = page
            .date
            .as_ref()
            .map(|d| strftime(d, DATE_FORMAT))
            .transpose()?;
        items.push(html! {
            li {
                a href=(page.url()) {
                    @if let Some(src) = &thumbnail {
                        img src=(src) alt=(page.title) loading="lazy";
                    }
                    span.entry {
                        span.entry-title { (page.title) }
                        @if let Some(date) = &date {
                            " "
                            span.page-meta { (date) }
                        }
                    }
                }
            }
        });
    }
    Ok(html! {
        ul.listing {
            @for item in items { (item) }
        }
    })
}

// ============================================================================
// Renderers
// ============================================================================

/// Maud-based HTML renderer with an RSS 2.0 feed.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    css: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self {
            css: CSS.to_string(),
        }
    }

    /// Stock style plus the stylesheet of a syntect highlighting theme.
    pub fn with_highlight_theme(theme: &str) -> Result<Self, HighlightError> {
        let theme_css = SyntectHighlighter::theme_css(theme)?;
        Ok(Self {
            css: format!("{CSS}\n{theme_css}"),
        })
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HtmlRenderer {
    fn render_page(
        &self,
        ctx: &RenderContext<'_, Page>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError> {
        let page = ctx.this;
        let site = ctx.site();
        let mut helpers = TemplateHelpers::new(ctx.base_path, recorder);
        let hero = helpers.page_image(page, TransformMode::Fit, HERO_SIZE);
        let date = match &page.date {
            Some(date) => Some((date.to_rfc3339(), strftime(date, DATE_FORMAT)?)),
            None => None,
        };
        let level = ctx.navigation.get(page.path()).map(|e| e.level.as_str());

        let content = html! {
            (site_header(&site, &page.category))
            main {
                article.page data-level=[level] {
                    h1 { (page.title) }
                    @if let Some((iso, display)) = &date {
                        p.page-meta { time datetime=(iso) { (display) } }
                    }
                    @if let Some(src) = &hero {
                        figure.hero { img src=(src) alt=(page.title); }
                    }
                    (PreEscaped(page.content.as_str()))
                    (tag_links(ctx.blog, &page.tags))
                }
                (pager(ctx))
            }
        };

        Ok(base_document(&document_title(&page.title, &site), &self.css, Some("page"), content)
            .into_string())
    }

    fn render_category(
        &self,
        ctx: &RenderContext<'_, Category>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError> {
        let category = ctx.this;
        let site = ctx.site();
        let mut helpers = TemplateHelpers::new(ctx.base_path, recorder);
        let pages = listing(ctx.blog.pages_of(&category.pages), &mut helpers)?;

        let content = html! {
            (site_header(&site, &category.path))
            main.category-index {
                h1 { (category.name) }
                (pages)
                (tag_links(ctx.blog, &category.related))
            }
        };

        Ok(
            base_document(&document_title(&category.name, &site), &self.css, Some("category"), content)
                .into_string(),
        )
    }

    fn render_tag(
        &self,
        ctx: &RenderContext<'_, Tag>,
        recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError> {
        let tag = ctx.this;
        let site = ctx.site();
        let mut helpers = TemplateHelpers::new(ctx.base_path, recorder);
        let pages = listing(ctx.blog.pages_of(&tag.pages), &mut helpers)?;
        let related: Vec<&Category> = tag
            .related
            .iter()
            .filter_map(|path| ctx.blog.taxonomy.categories.get(path))
            .filter(|c| !c.is_root())
            .collect();

        let content = html! {
            (site_header(&site, ""))
            main.tag-index {
                h1 { "#" (tag.title) }
                (pages)
                @if !related.is_empty() {
                    p.related {
                        "Also in: "
                        @for (i, category) in related.iter().enumerate() {
                            @if i > 0 { ", " }
                            a href={ (category.url) "/" } { (category.name) }
                        }
                    }
                }
            }
        };

        Ok(
            base_document(&document_title(&tag.title, &site), &self.css, Some("tag"), content)
                .into_string(),
        )
    }

    fn render_feed(
        &self,
        kind: &str,
        ctx: &RenderContext<'_, Feed>,
        _recorder: &mut ImageRecorder,
    ) -> Result<String, RenderError> {
        if kind != "rss" {
            return Err(RenderError::UnsupportedFeed(kind.to_string()));
        }
        let site = ctx.site();
        let server = site.server.trim_end_matches('/');

        let items: Vec<_> = ctx
            .blog
            .pages_of(&ctx.this.pages)
            .map(|page| {
                let link = format!("{server}{}/", page.url());
                ItemBuilder::default()
                    .title(Some(page.title.clone()))
                    .link(Some(link.clone()))
                    .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                    .description(page.extra_str("description").map(str::to_string))
                    .pub_date(page.date.map(|d| d.to_rfc2822()))
                    .categories(
                        page.tags
                            .iter()
                            .map(|name| rss::Category {
                                name: name.clone(),
                                domain: None,
                            })
                            .collect::<Vec<_>>(),
                    )
                    .build()
            })
            .collect();

        let channel = ChannelBuilder::default()
            .title(site.title.to_string())
            .link(format!("{server}/"))
            .description(site.title.to_string())
            .last_build_date(Some(ctx.this.date.to_rfc2822()))
            .generator(Some(format!("folio {}", env!("CARGO_PKG_VERSION"))))
            .items(items)
            .build();

        Ok(channel.to_string())
    }
}
