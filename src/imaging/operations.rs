//! High-level image operations.
//!
//! These functions turn a recorded transform into backend parameters and
//! execute them.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, TransformParams};
use super::queue::ImageTransform;
use crate::paths;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan a recorded transform without executing it.
///
/// `base` is the output directory of the unit that recorded the transform;
/// original and derived paths are relative to it.
pub fn plan_transform(
    transform: &ImageTransform,
    output_root: &Path,
    base: &str,
    quality: Quality,
) -> TransformParams {
    TransformParams {
        source: output_root.join(paths::normalize(&paths::join(base, &transform.original_path))),
        output: output_root.join(output_path(transform, base)),
        mode: transform.mode,
        width: transform.width,
        height: transform.height,
        quality,
    }
}

/// Output-root relative location of a transform's derived file.
pub fn output_path(transform: &ImageTransform, base: &str) -> String {
    paths::normalize(&paths::join(base, &transform.derived_path))
}

/// Plan and execute one transform. Returns the written file.
pub fn execute_transform(
    backend: &(impl ImageBackend + ?Sized),
    transform: &ImageTransform,
    output_root: &Path,
    base: &str,
    quality: Quality,
) -> Result<std::path::PathBuf> {
    let params = plan_transform(transform, output_root, base, quality);
    backend.transform(&params)?;
    Ok(params.output)
}
