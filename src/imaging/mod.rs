//! Derived image variants in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Fit** | aspect-preserving `resize_exact` (Lanczos3) |
//! | **Fill** | cover `resize_exact` + centred `crop_imm` |
//! | **Parallel drain** | `rayon` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math and derived names (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Planning and executing one recorded transform
//! - **Queue**: [`ImageRecorder`] per render unit, [`TransformQueue`] drained once per build

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod queue;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fill_dimensions, calculate_fit_dimensions, derived_path};
pub use operations::plan_transform;
pub use params::{Quality, TransformMode, TransformParams};
pub use queue::{DrainReport, ImageRecorder, ImageTransform, TransformFailure, TransformQueue};
pub use rust_backend::RustBackend;
