//! Pure calculation functions for image dimensions and derived names.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::TransformMode;
use crate::paths;

/// Calculate dimensions that fit inside a bounding box.
///
/// Preserves the source aspect ratio; one dimension matches the box, the
/// other is at most the box. Small sources are scaled up.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bound` - Bounding box (width, height)
///
/// # Returns
/// * `(width, height)` - Fitted dimensions, never zero
pub fn calculate_fit_dimensions(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = (src_w as f64 * scale).round() as u32;
    let h = (src_h as f64 * scale).round() as u32;
    (w.clamp(1, max_w.max(1)), h.clamp(1, max_h.max(1)))
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left corner of a centred `target` crop out of `filled`.
pub fn calculate_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}

/// Logical path of a derived image: `<dir>/<stem>-<mode>-<w>-<h><ext>`,
/// next to the original.
///
/// ```text
/// photos/cat.jpg, Fill, 320×180 → photos/cat-fill-320-180.jpg
/// ```
pub fn derived_path(original: &str, mode: TransformMode, width: u32, height: u32) -> String {
    let (stem, ext) = paths::split_extension(paths::basename(original));
    let name = format!("{stem}-{mode}-{width}-{height}{ext}");
    paths::join(paths::dirname(original), &name)
}
