//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes a pipeline run one video at a time, and
//! [`CancellationToken`] lets another thread ask the run to stop between
//! videos.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesieve::{Pipeline, PipelineConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.stage);
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::new().with_progress(Arc::new(PrintProgress));
//! Pipeline::new(config).run()?;
//! # Ok::<(), framesieve::PipelineError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The pipeline stage a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// Decoding and sampling videos.
    Sampling,
    /// Writing the manifest.
    Finalizing,
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage produced the report.
    pub stage: Stage,
    /// Videos finished so far (processed or skipped).
    pub videos_done: u64,
    /// Videos discovered for this run.
    pub videos_total: u64,
    /// Completion percentage (0.0 – 100.0), if any videos were discovered.
    pub percentage: Option<f32>,
    /// Stem of the video that just finished.
    pub current_video: Option<String>,
    /// Manifest records accumulated so far.
    pub records: u64,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on per-video throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be [`Send`] and [`Sync`] because reports may come
/// from worker threads when videos are processed in parallel.
pub trait ProgressCallback: Send + Sync {
    /// Called after each video and once more when the manifest is written.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// The pipeline checks the token before starting each video. A video that is
/// already being sampled is finished, the remaining ones are skipped, and the
/// manifest is still written for everything completed.
///
/// # Example
///
/// ```
/// use framesieve::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks per-video progress and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    done: u64,
    records: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            done: 0,
            records: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one finished video and report.
    pub(crate) fn advance(&mut self, video: Option<&str>, records: u64) {
        self.done += 1;
        self.records += records;
        self.report(Stage::Sampling, video);
    }

    /// Emit the final report once the manifest is on disk.
    pub(crate) fn finish(&mut self) {
        self.report(Stage::Finalizing, None);
    }

    fn report(&self, stage: Stage, video: Option<&str>) {
        let elapsed = self.start_time.elapsed();

        let percentage = (self.total > 0)
            .then(|| (self.done.min(self.total) as f32 / self.total as f32) * 100.0);

        let estimated_remaining = (self.done > 0 && self.total > 0).then(|| {
            let remaining = self.total.saturating_sub(self.done);
            let per_video = elapsed / self.done as u32;
            per_video * remaining as u32
        });

        let info = ProgressInfo {
            stage,
            videos_done: self.done,
            videos_total: self.total,
            percentage,
            current_video: video.map(str::to_string),
            records: self.records,
            elapsed,
            estimated_remaining,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        infos: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recording {
        fn on_progress(&self, info: &ProgressInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn tracker_reports_each_video_and_the_finish() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone(), 2);
        tracker.advance(Some("a"), 3);
        tracker.advance(Some("b"), 1);
        tracker.finish();

        let infos = recording.infos.lock().unwrap();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].current_video.as_deref(), Some("a"));
        assert_eq!(infos[0].percentage, Some(50.0));
        assert_eq!(infos[1].records, 4);
        assert_eq!(infos[2].stage, Stage::Finalizing);
        assert_eq!(infos[2].percentage, Some(100.0));
    }

    #[test]
    fn tracker_without_videos_has_no_percentage() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone(), 0);
        tracker.finish();

        let infos = recording.infos.lock().unwrap();
        assert_eq!(infos[0].percentage, None);
        assert_eq!(infos[0].estimated_remaining, None);
    }
}
