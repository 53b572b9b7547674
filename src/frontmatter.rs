//! YAML front matter extraction and the metadata source seam.
//!
//! A content file may open with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Hello
//! date: 2016-01-02
//! tags: [rust, web]
//! ---
//! Body text starts here.
//! ```
//!
//! The block may also be closed with `...`. Files without a leading fence
//! have no attributes and their whole text is the body.
//!
//! Attributes are kept as a JSON object so the indexer does not depend on
//! the header format.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured attributes read from a file's metadata header.
pub type Attributes = Map<String, Value>;

const FENCE: &str = "---";
const ALT_CLOSE: &str = "...";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter must be a mapping, found {0}")]
    NotAMapping(String),
}

/// Split `raw` into its YAML header and body, if it has a header.
fn split_header(raw: &str) -> Option<(&str, &str)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FENCE {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let end = offset + line.len();
        if matches!(line.trim_end(), FENCE | ALT_CLOSE) {
            return Some((&text[yaml_start..offset], &text[end..]));
        }
        offset = end;
    }
    None
}

/// Extract the metadata header from raw file text.
///
/// Returns the attributes and the remaining body. No header yields empty
/// attributes and the untouched text.
pub fn extract_header(raw: &str) -> Result<(Attributes, &str), MetadataError> {
    let Some((yaml, body)) = split_header(raw) else {
        return Ok((Attributes::new(), raw));
    };
    if yaml.trim().is_empty() {
        return Ok((Attributes::new(), body));
    }

    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(attributes) => Ok((attributes, body)),
        Value::Null => Ok((Attributes::new(), body)),
        other => Err(MetadataError::NotAMapping(other.to_string())),
    }
}

/// Drop the metadata header, keeping only the body.
///
/// Never fails: the header is removed by its fences even when the YAML
/// inside is malformed.
pub fn strip_header(raw: &str) -> &str {
    split_header(raw).map(|(_, body)| body).unwrap_or(raw)
}

/// Source of per-file attributes consumed by the indexer.
pub trait MetadataSource: Sync {
    /// Read the attributes of the content file at logical `path`.
    fn read(&self, path: &str) -> Result<Attributes, MetadataError>;
}

impl<F> MetadataSource for F
where
    F: Fn(&str) -> Result<Attributes, MetadataError> + Sync,
{
    fn read(&self, path: &str) -> Result<Attributes, MetadataError> {
        self(path)
    }
}

/// Reads front matter from files below a content root.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    root: PathBuf,
}

impl FileMetadata {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl MetadataSource for FileMetadata {
    fn read(&self, path: &str) -> Result<Attributes, MetadataError> {
        let raw = fs::read_to_string(self.root.join(path))?;
        extract_header(&raw).map(|(attributes, _)| attributes)
    }
}
