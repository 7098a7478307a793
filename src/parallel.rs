//! Parallel per-video sampling.
//!
//! Videos are distributed across a bounded [`rayon`] pool. Each worker opens
//! its own [`FrameSource`](crate::FrameSource), so the only shared state is
//! the sampler (read-only), the output directories, and the progress
//! tracker behind a mutex. Outcomes come back in discovery order, which
//! keeps the manifest identical to a sequential run.

use std::path::PathBuf;
use std::sync::Mutex;

use ::rayon::ThreadPoolBuilder;
use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::configuration::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{VideoOutcome, report, sample_video};
use crate::progress::ProgressTracker;
use crate::sampler::FrameSampler;

/// Sample `videos` on `config.workers` threads.
pub(crate) fn sample_videos_parallel(
    config: &PipelineConfig,
    sampler: &FrameSampler,
    videos: &[PathBuf],
    tracker: &mut ProgressTracker,
) -> Result<Vec<VideoOutcome>, PipelineError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|index| format!("framesieve-worker-{index}"))
        .build()
        .map_err(|error| {
            PipelineError::InvalidConfiguration(format!("failed to start worker pool: {error}"))
        })?;

    log::debug!(
        "Sampling {} videos on {} workers",
        videos.len(),
        config.workers
    );

    let tracker = Mutex::new(tracker);
    pool.install(|| {
        videos
            .par_iter()
            .map(|path| -> Result<VideoOutcome, PipelineError> {
                let outcome = sample_video(config, sampler, path)?;
                if let Ok(mut tracker) = tracker.lock() {
                    report(&mut **tracker, &outcome);
                }
                Ok(outcome)
            })
            .collect()
    })
}
