//! Record-then-execute queue for derived images.
//!
//! Rendering asks for image variants before they can exist: the originals
//! are only guaranteed in the output tree once every unit has rendered. So a
//! render unit records each request in its own [`ImageRecorder`] and gets
//! the derived path back at once, to use as a forward reference in markup.
//! After rendering, the build driver gathers the recorders into a
//! [`TransformQueue`] and drains it exactly once.
//!
//! ```text
//! render unit ──record──▶ ImageRecorder ─┐
//! render unit ──record──▶ ImageRecorder ─┼─extend─▶ TransformQueue ──drain──▶ files
//! render unit ──record──▶ ImageRecorder ─┘
//! ```
//!
//! Each recorder is owned by a single unit and only appended to, so
//! recording needs no lock. Draining runs the transforms in parallel; a
//! failing transform is reported and does not stop its siblings.

use super::backend::{BackendError, ImageBackend};
use super::calculations::derived_path;
use super::operations::{self, execute_transform};
use super::params::{Quality, TransformMode};
use crate::paths;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One recorded image request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageTransform {
    pub mode: TransformMode,
    /// Logical path of the unit that recorded it (a page, a category index…).
    pub base_path: String,
    /// Original image, relative to the base's output directory.
    pub original_path: String,
    /// Derived image, relative to the base's output directory.
    pub derived_path: String,
    pub width: u32,
    pub height: u32,
}

/// Append-only transform log of one render unit.
#[derive(Debug, Default)]
pub struct ImageRecorder {
    transforms: Vec<ImageTransform>,
}

impl ImageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transform and return the derived path.
    ///
    /// The returned path sits next to `original` and is named
    /// `<stem>-<mode>-<width>-<height><ext>`.
    pub fn record(
        &mut self,
        base_path: &str,
        original: &str,
        width: u32,
        height: u32,
        mode: TransformMode,
    ) -> String {
        let derived = derived_path(original, mode, width, height);
        self.transforms.push(ImageTransform {
            mode,
            base_path: base_path.to_string(),
            original_path: original.to_string(),
            derived_path: derived.clone(),
            width,
            height,
        });
        derived
    }

    pub fn transforms(&self) -> &[ImageTransform] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// A transform that could not be carried out.
#[derive(Debug)]
pub struct TransformFailure {
    pub transform: ImageTransform,
    pub error: BackendError,
}

/// Outcome of draining a [`TransformQueue`].
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Derived files written, in no particular order.
    pub generated: Vec<PathBuf>,
    pub failures: Vec<TransformFailure>,
}

impl DrainReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// All transforms recorded during a build, waiting to be drained.
#[derive(Debug, Default)]
pub struct TransformQueue {
    pending: Vec<ImageTransform>,
}

impl TransformQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over a unit's recorded transforms.
    pub fn extend(&mut self, recorder: ImageRecorder) {
        self.pending.extend(recorder.transforms);
    }

    pub fn pending(&self) -> &[ImageTransform] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Execute every pending transform, consuming the queue.
    ///
    /// `resolve` maps a base path to its output path; the transform's files
    /// live in that output path's directory under `output_root`. Runs on the
    /// current rayon pool. Transforms that resolve to an already planned
    /// derived file are skipped.
    pub fn drain<B, R>(
        self,
        backend: &B,
        output_root: &Path,
        resolve: R,
        quality: Quality,
    ) -> DrainReport
    where
        B: ImageBackend + ?Sized,
        R: Fn(&str) -> String,
    {
        let mut planned = HashSet::new();
        let unique: Vec<(String, ImageTransform)> = self
            .pending
            .into_iter()
            .filter_map(|transform| {
                let base = paths::dirname(&resolve(&transform.base_path)).to_string();
                let output = operations::output_path(&transform, &base);
                if planned.insert(output.clone()) {
                    Some((base, transform))
                } else {
                    debug!("{output} already planned");
                    None
                }
            })
            .collect();

        let results: Vec<_> = unique
            .into_par_iter()
            .map(|(base, transform)| {
                info!("generating {}", operations::output_path(&transform, &base));
                execute_transform(backend, &transform, output_root, &base, quality)
                    .map_err(|error| TransformFailure { transform, error })
            })
            .collect();

        let mut report = DrainReport::default();
        for result in results {
            match result {
                Ok(path) => report.generated.push(path),
                Err(failure) => {
                    warn!(
                        "image {} for {}: {}",
                        failure.transform.original_path, failure.transform.base_path, failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::rust_backend::RustBackend;
    use crate::imaging::{Dimensions, ImageBackend as _};
    use crate::test_helpers::write_image;

    #[test]
    fn record_returns_derived_path_immediately() {
        let mut recorder = ImageRecorder::new();
        let derived = recorder.record("a/b.md", "img/photo.jpg", 100, 50, TransformMode::Fit);
        assert_eq!(derived, "img/photo-fit-100-50.jpg");
        assert_eq!(recorder.len(), 1);
        assert_eq!(
            recorder.transforms()[0],
            ImageTransform {
                mode: TransformMode::Fit,
                base_path: "a/b.md".into(),
                original_path: "img/photo.jpg".into(),
                derived_path: "img/photo-fit-100-50.jpg".into(),
                width: 100,
                height: 50,
            }
        );
    }

    #[test]
    fn recorders_merge_in_order() {
        let mut first = ImageRecorder::new();
        first.record("x.md", "a.png", 1, 1, TransformMode::Fit);
        let mut second = ImageRecorder::new();
        second.record("y.md", "b.png", 2, 2, TransformMode::Fill);

        let mut queue = TransformQueue::new();
        queue.extend(first);
        queue.extend(second);
        let bases: Vec<&str> = queue.pending().iter().map(|t| t.base_path.as_str()).collect();
        assert_eq!(bases, vec!["x.md", "y.md"]);
    }

    #[test]
    fn drain_resolves_base_through_output_path() {
        let mut recorder = ImageRecorder::new();
        recorder.record("a/b.md", "photo.jpg", 100, 50, TransformMode::Fit);
        let mut queue = TransformQueue::new();
        queue.extend(recorder);

        let backend = MockBackend::new();
        let report = queue.drain(&backend, Path::new("/out"), paths::output_path, Quality::default());
        assert!(report.is_success());
        assert_eq!(report.generated, vec![PathBuf::from("/out/a/b/photo-fit-100-50.jpg")]);
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Transform { source, .. } if source == "/out/a/b/photo.jpg"
        ));
    }

    #[test]
    fn failures_are_isolated() {
        let mut recorder = ImageRecorder::new();
        recorder.record("p.md", "bad.jpg", 10, 10, TransformMode::Fill);
        recorder.record("p.md", "good.jpg", 10, 10, TransformMode::Fill);
        recorder.record("q.md", "fine.jpg", 10, 10, TransformMode::Fit);
        let mut queue = TransformQueue::new();
        queue.extend(recorder);

        let backend = MockBackend::failing_on(&["bad.jpg"]);
        let report = queue.drain(&backend, Path::new("/out"), paths::output_path, Quality::default());
        assert_eq!(report.generated.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].transform.original_path, "bad.jpg");
        assert_eq!(report.failures[0].transform.base_path, "p.md");
    }

    #[test]
    fn same_derived_file_is_generated_once() {
        let mut category = ImageRecorder::new();
        category.record("posts/index.html", "cover.jpg", 32, 18, TransformMode::Fill);
        let mut tag = ImageRecorder::new();
        tag.record("rust/index.html", "../posts/cover.jpg", 32, 18, TransformMode::Fill);
        let mut queue = TransformQueue::new();
        queue.extend(category);
        queue.extend(tag);

        let backend = MockBackend::new();
        let report = queue.drain(&backend, Path::new("/out"), paths::output_path, Quality::default());
        assert_eq!(report.generated, vec![PathBuf::from("/out/posts/cover-fill-32-18.jpg")]);
        assert_eq!(backend.get_operations().len(), 1);
    }

    #[test]
    fn empty_queue_drains_to_empty_report() {
        let report = TransformQueue::new().drain(
            &MockBackend::new(),
            Path::new("/out"),
            paths::output_path,
            Quality::default(),
        );
        assert!(report.generated.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn real_fit_and_fill_under_base() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_image(&tmp.path().join("a/b/photo.jpg"), 400, 300);

        let mut recorder = ImageRecorder::new();
        let fit = recorder.record("a/b.md", "photo.jpg", 100, 50, TransformMode::Fit);
        let fill = recorder.record("a/b.md", "photo.jpg", 100, 50, TransformMode::Fill);
        let mut queue = TransformQueue::new();
        queue.extend(recorder);

        let report = queue.drain(&RustBackend::new(), tmp.path(), paths::output_path, Quality::default());
        assert!(report.is_success(), "{:?}", report.failures);

        let backend = RustBackend::new();
        let fit_dims = backend.identify(&tmp.path().join("a/b").join(fit)).unwrap();
        assert!(fit_dims.width <= 100 && fit_dims.height <= 50);
        assert_eq!(fit_dims, Dimensions { width: 67, height: 50 });

        let fill_dims = backend.identify(&tmp.path().join("a/b/photo-fill-100-50.jpg")).unwrap();
        assert_eq!(fill_dims, Dimensions { width: 100, height: 50 });
        assert_eq!(fill, "photo-fill-100-50.jpg");
    }
}
