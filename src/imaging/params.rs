//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`queue`](super::queue) (which decides what images
//! to create) and the [`backend`](super::backend) (which does the pixel
//! work), so tests can swap in a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`TransformMode`]: `fit` (bounded, aspect-preserving) or `fill` (exact size, cropped).
//! - [`TransformParams`]: Everything needed to produce one derived image.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// How a derived image relates to its requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Preserve aspect ratio, bounded by the box. No cropping.
    Fit,
    /// Cover the box, then centre-crop to exactly its size.
    Fill,
}

impl TransformMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Fill => "fill",
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for producing one derived image.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub mode: TransformMode,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
