//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Fit / fill resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Fill crop | `DynamicImage::crop_imm`, centred |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode other formats | `DynamicImage::save_with_format` |
//!
//! Derived images keep the original's format, chosen from the output
//! extension.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    calculate_crop_offset, calculate_fill_dimensions, calculate_fit_dimensions,
};
use super::params::{TransformMode, TransformParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Resize `img` to the requested box according to `mode`.
fn apply(img: &DynamicImage, mode: TransformMode, width: u32, height: u32) -> DynamicImage {
    let source = (img.width(), img.height());
    match mode {
        TransformMode::Fit => {
            let (w, h) = calculate_fit_dimensions(source, (width, height));
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        TransformMode::Fill => {
            let filled = calculate_fill_dimensions(source, (width, height));
            let (x, y) = calculate_crop_offset(filled, (width, height));
            img.resize_exact(filled.0, filled.1, FilterType::Lanczos3)
                .crop_imm(x, y, width, height)
        }
    }
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path).map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Unsupported output format {}: {}",
            path.display(),
            e
        ))
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        ImageFormat::Jpeg => save_jpeg(img, path, quality),
        other => img.save_with_format(path, other).map_err(|e| {
            BackendError::ProcessingFailed(format!("Encode {} failed: {}", path.display(), e))
        }),
    }
}

/// JPEG has no alpha channel, so the image is flattened to RGB first.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn transform(&self, params: &TransformParams) -> Result<(), BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Empty target box {}x{}",
                params.width, params.height
            )));
        }
        let img = load_image(&params.source)?;
        let derived = apply(&img, params.mode, params.width, params.height);
        save_image(&derived, &params.output, params.quality.value())
    }
}
