//! Pipeline configuration.
//!
//! [`PipelineConfig`] names every directory and file the pipeline touches,
//! the sampling stride, and the extensions that count as videos. All paths
//! are explicit: the defaults are relative paths, and
//! [`rooted_at`](PipelineConfig::rooted_at) anchors them under a chosen
//! directory so nothing depends on the process working directory.
//!
//! # Example
//!
//! ```no_run
//! use framesieve::{CancellationToken, PipelineConfig};
//!
//! let token = CancellationToken::new();
//! let config = PipelineConfig::rooted_at("/data/session-12")
//!     .with_frame_stride(15)
//!     .with_video_extensions(["mp4", "mov"])
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default directory scanned for videos.
pub const DEFAULT_VIDEO_DIR: &str = "videos";
/// Default directory for sampled frame images.
pub const DEFAULT_FRAME_DIR: &str = "frames";
/// Default directory for prediction images.
pub const DEFAULT_PREDICT_DIR: &str = "predict";
/// Default manifest path.
pub const DEFAULT_OUTPUT_CSV: &str = "inspection.csv";
/// Default sampling stride.
pub const DEFAULT_FRAME_STRIDE: u64 = 30;
/// Default video extensions.
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".avi"];

/// Configuration for a pipeline run.
///
/// The pipeline clones its configuration when it is constructed, so the
/// values stay fixed for the duration of a run.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for videos.
    pub video_dir: PathBuf,
    /// Directory receiving `{stem}_frame_{index:04}.jpg` images.
    pub frame_dir: PathBuf,
    /// Directory receiving `{stem}_predict_{index:04}.jpg` images.
    pub predict_dir: PathBuf,
    /// Manifest path.
    pub output_csv: PathBuf,
    /// Every `frame_stride`-th frame is sampled, starting at frame 0.
    pub frame_stride: u64,
    /// File extensions treated as videos, with or without a leading dot.
    pub video_extensions: Vec<String>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) workers: usize,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("video_dir", &self.video_dir)
            .field("frame_dir", &self.frame_dir)
            .field("predict_dir", &self.predict_dir)
            .field("output_csv", &self.output_csv)
            .field("frame_stride", &self.frame_stride)
            .field("video_extensions", &self.video_extensions)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("workers", &self.workers)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Create a configuration with the default relative paths.
    ///
    /// Defaults: `videos/`, `frames/`, `predict/`, `inspection.csv`, stride
    /// 30, extensions `.mp4` and `.avi`, sequential processing.
    pub fn new() -> Self {
        Self {
            video_dir: PathBuf::from(DEFAULT_VIDEO_DIR),
            frame_dir: PathBuf::from(DEFAULT_FRAME_DIR),
            predict_dir: PathBuf::from(DEFAULT_PREDICT_DIR),
            output_csv: PathBuf::from(DEFAULT_OUTPUT_CSV),
            frame_stride: DEFAULT_FRAME_STRIDE,
            video_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|extension| extension.to_string())
                .collect(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            workers: 1,
        }
    }

    /// Create a default configuration whose paths live under `root`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let mut config = Self::new();
        config.video_dir = root.join(DEFAULT_VIDEO_DIR);
        config.frame_dir = root.join(DEFAULT_FRAME_DIR);
        config.predict_dir = root.join(DEFAULT_PREDICT_DIR);
        config.output_csv = root.join(DEFAULT_OUTPUT_CSV);
        config
    }

    #[must_use]
    pub fn with_video_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.video_dir = path.into();
        self
    }

    #[must_use]
    pub fn with_frame_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.frame_dir = path.into();
        self
    }

    #[must_use]
    pub fn with_predict_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.predict_dir = path.into();
        self
    }

    #[must_use]
    pub fn with_output_csv<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_csv = path.into();
        self
    }

    /// Set the sampling stride. Zero is rejected by [`validate`](Self::validate).
    #[must_use]
    pub fn with_frame_stride(mut self, stride: u64) -> Self {
        self.frame_stride = stride;
        self
    }

    /// Replace the set of extensions treated as videos.
    #[must_use]
    pub fn with_video_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.video_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a progress callback, invoked after each video.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each video.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how many videos may be processed concurrently.
    ///
    /// Only honoured when the `rayon` feature is enabled. Clamped to a
    /// minimum of 1.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Number of concurrent workers requested.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Check that the configuration can drive a run.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidStride`] for a zero stride and
    /// [`PipelineError::InvalidConfiguration`] when no usable video
    /// extension is configured.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_stride == 0 {
            return Err(PipelineError::InvalidStride);
        }
        if self.normalized_extensions().is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "at least one video extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Extensions lowercased and stripped of their leading dot.
    pub(crate) fn normalized_extensions(&self) -> Vec<String> {
        self.video_extensions
            .iter()
            .map(|extension| extension.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|extension| !extension.is_empty())
            .collect()
    }

    /// Directories that must exist before discovery.
    pub(crate) fn required_directories(&self) -> Vec<&Path> {
        let mut directories = vec![
            self.frame_dir.as_path(),
            self.predict_dir.as_path(),
            self.video_dir.as_path(),
        ];
        if let Some(parent) = self.output_csv.parent() {
            if !parent.as_os_str().is_empty() {
                directories.push(parent);
            }
        }
        directories
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
