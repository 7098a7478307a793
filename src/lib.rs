//! # framesieve
//!
//! Sample frames from a directory of videos at a fixed stride, write each
//! sampled frame and a prediction artifact to disk, and record every sample
//! in a CSV manifest for human review.
//!
//! Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; images are
//! encoded with [`image`](https://crates.io/crates/image).
//!
//! ## Quick Start
//!
//! ```no_run
//! use framesieve::{Pipeline, PipelineConfig};
//!
//! // videos/*.mp4|*.avi -> frames/, predict/, inspection.csv
//! let summary = Pipeline::new(PipelineConfig::new()).run()?;
//! println!("wrote {} rows", summary.records_written);
//! # Ok::<(), framesieve::PipelineError>(())
//! ```
//!
//! ### Plugging in a model
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesieve::{Pipeline, PipelineConfig, Predictor};
//! use image::DynamicImage;
//!
//! struct Grayscale;
//!
//! impl Predictor for Grayscale {
//!     fn predict(&self, frame: &DynamicImage) -> Result<DynamicImage, String> {
//!         Ok(DynamicImage::ImageLuma8(image::imageops::grayscale(frame)))
//!     }
//! }
//!
//! let mut pipeline = Pipeline::new(PipelineConfig::new().with_frame_stride(10))
//!     .with_predictor(Arc::new(Grayscale));
//! pipeline.run()?;
//! # Ok::<(), framesieve::PipelineError>(())
//! ```
//!
//! ## Outputs
//!
//! - `frames/{stem}_frame_{index:04}.jpg` for every sampled frame
//! - `predict/{stem}_predict_{index:04}.jpg` for its prediction
//! - `inspection.csv` with columns `video,frame,frame_path,predict_path,status`
//!
//! When no videos are found the manifest holds a single `sample_video` row.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Process several videos concurrently (`PipelineConfig::with_workers`) |
//! | `full`  | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod error;
pub mod ffmpeg;
pub mod manifest;
#[cfg(feature = "rayon")]
mod parallel;
pub mod pipeline;
pub mod predictor;
pub mod progress;
pub mod record;
pub mod sampler;
pub mod source;
pub mod workspace;
pub mod writer;

pub use configuration::PipelineConfig;
pub use error::PipelineError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use manifest::Manifest;
pub use pipeline::{Pipeline, PipelineState, RunSummary, SkippedVideo};
pub use predictor::{EchoPredictor, Predictor};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo, Stage};
pub use record::{FrameRecord, RecordStatus, frame_file_name, predict_file_name};
pub use sampler::{FrameSampler, SampledVideo};
pub use source::{FrameSequence, FrameSource, ImageSequence, video_stem};
pub use workspace::{discover_videos, provision_directories};
pub use writer::{MANIFEST_COLUMNS, ManifestWriter};
