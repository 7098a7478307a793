//! The pipeline orchestrator.
//!
//! [`Pipeline::run`] drives one complete pass:
//!
//! ```text
//! Idle -> Discovering -> Sampling (once per video) -> Finalizing -> Done
//! ```
//!
//! Directories are provisioned and videos discovered first. Each video is
//! then opened, sampled, and predicted to completion before the next one
//! starts (or concurrently, with the `rayon` feature and more than one
//! worker). A video that cannot be opened is skipped, as is one whose stem
//! was already taken by an earlier video. A frame, prediction,
//! or manifest that cannot be written aborts the run. When discovery finds
//! nothing, a single placeholder row is written instead.
//!
//! # Example
//!
//! ```no_run
//! use framesieve::{Pipeline, PipelineConfig};
//!
//! let summary = Pipeline::new(PipelineConfig::rooted_at("/data/session-12")).run()?;
//! println!("{} rows in {}", summary.records_written, summary.manifest_path.display());
//! # Ok::<(), framesieve::PipelineError>(())
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::PipelineConfig;
use crate::error::PipelineError;
use crate::manifest::Manifest;
use crate::predictor::{EchoPredictor, Predictor};
use crate::progress::ProgressTracker;
use crate::sampler::{FrameSampler, SampledVideo};
use crate::source::{FrameSource, video_stem};
use crate::workspace::{discover_videos, provision_directories};
use crate::writer::ManifestWriter;

/// Where a pipeline is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, not yet run.
    Idle,
    /// Provisioning directories and listing videos.
    Discovering,
    /// Sampling video `index` (zero-based) of `total`.
    Sampling { index: usize, total: usize },
    /// Writing the manifest.
    Finalizing,
    /// The manifest is on disk.
    Done,
}

/// A discovered video that contributed no records.
#[derive(Debug, Clone)]
pub struct SkippedVideo {
    /// Path of the video as discovered.
    pub path: PathBuf,
    /// Why it was not sampled.
    pub reason: String,
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Video files found in the video directory.
    pub videos_discovered: usize,
    /// Videos opened and sampled to the end of their stream.
    pub videos_processed: usize,
    /// Videos that could not be opened or whose stem was already taken.
    pub skipped: Vec<SkippedVideo>,
    /// Frames decoded across all processed videos.
    pub frames_decoded: u64,
    /// Rows in the manifest, header excluded.
    pub records_written: usize,
    /// Whether the placeholder row was written because nothing was found.
    pub used_fallback: bool,
    /// Whether cancellation cut the run short.
    pub cancelled: bool,
    /// Where the manifest was written.
    pub manifest_path: PathBuf,
}

/// The result of handing one video to the sampler.
pub(crate) enum VideoOutcome {
    Sampled { stem: String, sampled: SampledVideo },
    Skipped(SkippedVideo),
    Cancelled,
}

/// Samples every discovered video and writes the manifest.
pub struct Pipeline {
    config: PipelineConfig,
    predictor: Arc<dyn Predictor>,
    state: PipelineState,
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline using the placeholder [`EchoPredictor`].
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            predictor: Arc::new(EchoPredictor),
            state: PipelineState::Idle,
        }
    }

    /// Substitute the predictor invoked on every sampled frame.
    #[must_use]
    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = predictor;
        self
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Where the pipeline is in its run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the pipeline to completion.
    ///
    /// # Errors
    ///
    /// Configuration errors, directory provisioning or discovery failures,
    /// and any image or manifest write failure. Videos that fail to open
    /// are reported in [`RunSummary::skipped`] instead.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;
        let config = self.config.clone();

        self.transition(PipelineState::Discovering);
        provision_directories(&config)?;
        let discovered = discover_videos(&config.video_dir, &config.video_extensions)?;
        let videos_discovered = discovered.len();
        let (videos, collisions) = partition_stem_collisions(discovered);

        let sampler = FrameSampler::from_config(&config, Arc::clone(&self.predictor))?;
        let mut tracker = ProgressTracker::new(Arc::clone(&config.progress), videos.len() as u64);
        let mut manifest = Manifest::new();
        let mut summary = RunSummary {
            videos_discovered,
            videos_processed: 0,
            skipped: collisions,
            frames_decoded: 0,
            records_written: 0,
            used_fallback: false,
            cancelled: false,
            manifest_path: config.output_csv.clone(),
        };

        if videos.is_empty() {
            log::info!(
                "No video files found in {}; writing a sample record",
                config.video_dir.display()
            );
            manifest.add_sentinel(&config.frame_dir, &config.predict_dir);
            summary.used_fallback = true;
        } else {
            let outcomes = self.sample_videos(&sampler, &videos, &mut tracker)?;
            let mut not_started = 0;
            for (ordinal, outcome) in outcomes.into_iter().enumerate() {
                match outcome {
                    VideoOutcome::Sampled { stem, sampled } => {
                        log::info!("Processed {} frames from {stem}", sampled.frames_seen);
                        summary.videos_processed += 1;
                        summary.frames_decoded += sampled.frames_seen;
                        manifest.add_video(ordinal, sampled.records);
                    }
                    VideoOutcome::Skipped(skipped) => summary.skipped.push(skipped),
                    VideoOutcome::Cancelled => {
                        summary.cancelled = true;
                        not_started += 1;
                    }
                }
            }
            if summary.cancelled {
                log::warn!(
                    "Run cancelled after {} of {} video(s)",
                    videos.len() - not_started,
                    videos.len()
                );
            }
        }

        self.transition(PipelineState::Finalizing);
        summary.records_written = ManifestWriter::new(&config.output_csv).write(&mut manifest)?;
        tracker.finish();

        self.transition(PipelineState::Done);
        Ok(summary)
    }

    /// Sample every video, returning one outcome per video in discovery order.
    fn sample_videos(
        &mut self,
        sampler: &FrameSampler,
        videos: &[PathBuf],
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<VideoOutcome>, PipelineError> {
        #[cfg(feature = "rayon")]
        {
            if self.config.workers > 1 && videos.len() > 1 {
                let total = videos.len();
                self.transition(PipelineState::Sampling { index: 0, total });
                return crate::parallel::sample_videos_parallel(&self.config, sampler, videos, tracker);
            }
        }

        let total = videos.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, path) in videos.iter().enumerate() {
            self.transition(PipelineState::Sampling { index, total });
            let outcome = sample_video(&self.config, sampler, path)?;
            report(tracker, &outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("Pipeline state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Open and sample one video.
///
/// Open failures become [`VideoOutcome::Skipped`]; write failures propagate.
pub(crate) fn sample_video(
    config: &PipelineConfig,
    sampler: &FrameSampler,
    path: &Path,
) -> Result<VideoOutcome, PipelineError> {
    if config.is_cancelled() {
        return Ok(VideoOutcome::Cancelled);
    }

    let mut source = match FrameSource::open(path) {
        Ok(source) => source,
        Err(error) if error.is_input_failure() => {
            log::warn!("Cannot open video {}: {error}", path.display());
            return Ok(VideoOutcome::Skipped(SkippedVideo {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }));
        }
        Err(error) => return Err(error),
    };

    let stem = video_stem(path);
    let sampled = sampler.sample(&stem, &mut source)?;
    Ok(VideoOutcome::Sampled { stem, sampled })
}

/// Split off videos whose stem was already claimed by an earlier video.
///
/// Outputs are named after the stem, so two videos sharing one would write
/// the same images. The first in discovery order wins.
fn partition_stem_collisions(videos: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<SkippedVideo>) {
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut kept = Vec::with_capacity(videos.len());
    let mut skipped = Vec::new();

    for path in videos {
        match claimed.entry(video_stem(&path)) {
            Entry::Occupied(owner) => {
                let reason = format!(
                    "stem \"{}\" is already used by {}",
                    owner.key(),
                    owner.get().display()
                );
                log::warn!("Skipping video {}: {reason}", path.display());
                skipped.push(SkippedVideo { path, reason });
            }
            Entry::Vacant(slot) => {
                slot.insert(path.clone());
                kept.push(path);
            }
        }
    }
    (kept, skipped)
}

/// Feed one finished video into the progress tracker.
pub(crate) fn report(tracker: &mut ProgressTracker, outcome: &VideoOutcome) {
    match outcome {
        VideoOutcome::Sampled { stem, sampled } => {
            tracker.advance(Some(stem), sampled.records.len() as u64)
        }
        VideoOutcome::Skipped(skipped) => {
            tracker.advance(Some(&video_stem(&skipped.path)), 0)
        }
        VideoOutcome::Cancelled => {}
    }
}
