//! Error types for the `framesieve` crate.
//!
//! [`PipelineError`] is the single error type returned by every fallible
//! operation. Variants fall into two families that the orchestrator treats
//! differently:
//!
//! - **input failures** ([`is_input_failure`](PipelineError::is_input_failure)):
//!   a video could not be opened or decoded. The video is skipped and the run
//!   continues.
//! - **output failures** ([`is_output_failure`](PipelineError::is_output_failure)):
//!   a frame, prediction, directory, or manifest could not be produced. The
//!   run aborts.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framesieve` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path of the video that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file opened but contains no video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// A decoded frame could not be converted to an image.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A frame stride of zero was configured.
    #[error("Frame stride must be greater than zero")]
    InvalidStride,

    /// The pipeline configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A required output or input directory could not be created.
    #[error("Failed to provision directory {path}: {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// The video directory could not be listed.
    #[error("Failed to list video directory {path}: {source}")]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// A sampled frame or prediction image could not be written.
    #[error("Failed to write image {path}: {source}")]
    FrameWrite {
        /// Target image path.
        path: PathBuf,
        /// Underlying encoder or I/O error.
        #[source]
        source: ImageError,
    },

    /// The predictor failed on a sampled frame.
    #[error("Prediction failed for {video} frame {frame}: {reason}")]
    Prediction {
        /// Stem of the video being processed.
        video: String,
        /// Index of the frame handed to the predictor.
        frame: u64,
        /// Reason reported by the predictor.
        reason: String,
    },

    /// The manifest could not be written.
    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        /// Target manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },
}

impl PipelineError {
    /// Returns `true` for errors that only affect a single input video.
    ///
    /// The orchestrator skips the video and keeps going.
    pub fn is_input_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::FileOpen { .. }
                | PipelineError::NoVideoStream { .. }
                | PipelineError::VideoDecodeError(_)
                | PipelineError::FfmpegError(_)
        )
    }

    /// Returns `true` for errors that prevent output from being produced.
    pub fn is_output_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Directory { .. }
                | PipelineError::Discovery { .. }
                | PipelineError::FrameWrite { .. }
                | PipelineError::Prediction { .. }
                | PipelineError::ManifestWrite { .. }
        )
    }
}

impl From<FfmpegError> for PipelineError {
    fn from(error: FfmpegError) -> Self {
        PipelineError::FfmpegError(error.to_string())
    }
}
