//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the drain needs:
//! identify and transform. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend); tests use the
//! recording [`MockBackend`](tests::MockBackend).

use super::params::TransformParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve the parallel drain.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Load `params.source`, resize per `params.mode` and write `params.output`.
    fn transform(&self, params: &TransformParams) -> Result<(), BackendError>;
}
