//! # Folio
//!
//! The content-organization core of a static blog. Content files with YAML
//! front matter become a taxonomy of categories and tags, a navigation map,
//! syndication feeds and a directory-per-page output tree.
//!
//! # Architecture: Index Once, Render in Parallel, Drain Once
//!
//! ```text
//! 1. Index    content/  →  BlogStructure   (files + front matter → taxonomy, feeds)
//! 2. Render   structure →  dist/           (pages, category/tag indices, feeds)
//! 3. Drain    recorders →  dist/           (derived image variants)
//! ```
//!
//! Indexing is synchronous and produces a read-only [`types::BlogStructure`].
//! Rendering runs one unit per rayon task; a unit only reads the structure
//! and writes its own [`imaging::ImageRecorder`]. Image variants cannot be
//! produced while rendering because their originals may not be in the output
//! tree yet, so requests are recorded and executed once at the end.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`paths`] | Directory-per-page path mapping (`a/b.md` → `a/b/index.html`) |
//! | [`frontmatter`] | YAML header extraction and the [`frontmatter::MetadataSource`] seam |
//! | [`metadata`] | Typed page metadata merge: defaults < front matter < identity |
//! | [`types`] | Pages, categories, tags, feeds and the blog structure |
//! | [`config`] | `folio.toml` loading, validation and merging |
//! | [`index`] | Builds the taxonomy from the discovered files |
//! | [`feed`] | Per-feed lists of dated pages |
//! | [`navigation`] | Navigation map and table-of-contents summary |
//! | [`highlight`] | Syntax highlighting of code blocks (syntect) |
//! | [`rewrite`] | Link rewriting for pages moved one directory deeper |
//! | [`imaging`] | Fit / fill image variants and the record-then-drain queue |
//! | [`render`] | Maud HTML documents and RSS feeds |
//! | [`site`] | Build driver: discovery, phase ordering, failure isolation |
//! | [`output`] | Console formatting of the structure and build reports |
//!
//! # Design Decisions
//!
//! ## Keys, Not Pointers
//!
//! Pages, categories and tags refer to each other by key (page path,
//! category path, tag name). The structure is a plain tree of owned maps
//! that serializes as-is and can be shared read-only across threads.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system. Malformed markup is a build error, interpolation is
//! escaped by default, and there is no template directory to ship. Custom
//! output plugs in through the [`render::Renderer`] trait instead.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) and
//! encodes variants in the format of their original. No system libraries are
//! needed.
//!
//! ## Failure Isolation
//!
//! A broken page or image does not stop the build. Structural problems
//! (unreadable content root, two files publishing to one path) are fatal and
//! returned before anything is written; per-unit problems are collected in
//! [`site::BuildReport`].

pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod highlight;
pub mod imaging;
pub mod index;
pub mod metadata;
pub mod navigation;
pub mod output;
pub mod paths;
pub mod render;
pub mod rewrite;
pub mod site;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
