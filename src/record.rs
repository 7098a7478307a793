//! Manifest rows and output file naming.

use std::fmt;
use std::path::{Path, PathBuf};

/// Video name used by the placeholder row of an empty run.
pub const SENTINEL_VIDEO: &str = "sample_video";
/// Frame image name used by the placeholder row of an empty run.
pub const SENTINEL_FRAME_FILE: &str = "sample_frame.jpg";
/// Prediction image name used by the placeholder row of an empty run.
pub const SENTINEL_PREDICT_FILE: &str = "sample_predict.jpg";

/// File name of a sampled frame image: `{stem}_frame_{index:04}.jpg`.
///
/// Indices wider than four digits are kept whole.
///
/// ```
/// assert_eq!(framesieve::frame_file_name("clip", 5), "clip_frame_0005.jpg");
/// assert_eq!(framesieve::frame_file_name("clip", 12000), "clip_frame_12000.jpg");
/// ```
pub fn frame_file_name(stem: &str, index: u64) -> String {
    format!("{stem}_frame_{index:04}.jpg")
}

/// File name of a prediction image: `{stem}_predict_{index:04}.jpg`.
pub fn predict_file_name(stem: &str, index: u64) -> String {
    format!("{stem}_predict_{index:04}.jpg")
}

/// Review status of a manifest row.
///
/// Rows start out [`Pending`](RecordStatus::Pending) and are marked
/// [`Processed`](RecordStatus::Processed) when the manifest is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordStatus {
    /// Sampled, not yet written to a manifest.
    #[default]
    Pending,
    /// Written to the manifest.
    Processed,
}

impl RecordStatus {
    /// The value stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest row: a sampled frame and its prediction artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    video: String,
    frame: u64,
    frame_path: PathBuf,
    predict_path: PathBuf,
    status: RecordStatus,
}

impl FrameRecord {
    /// Build the record for frame `index` of video `stem`.
    ///
    /// Both paths derive from the same `(stem, index)` pair.
    pub fn sampled(stem: &str, index: u64, frame_dir: &Path, predict_dir: &Path) -> Self {
        Self {
            video: stem.to_string(),
            frame: index,
            frame_path: frame_dir.join(frame_file_name(stem, index)),
            predict_path: predict_dir.join(predict_file_name(stem, index)),
            status: RecordStatus::Pending,
        }
    }

    /// The placeholder row written when no videos are discovered.
    pub fn sentinel(frame_dir: &Path, predict_dir: &Path) -> Self {
        Self {
            video: SENTINEL_VIDEO.to_string(),
            frame: 0,
            frame_path: frame_dir.join(SENTINEL_FRAME_FILE),
            predict_path: predict_dir.join(SENTINEL_PREDICT_FILE),
            status: RecordStatus::Pending,
        }
    }

    /// Stem of the source video.
    pub fn video(&self) -> &str {
        &self.video
    }

    /// Zero-based decode index of the frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Where the sampled frame image is written.
    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    /// Where the prediction image is written.
    pub fn predict_path(&self) -> &Path {
        &self.predict_path
    }

    /// Current review status.
    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Mark the row as processed. Only the status ever changes.
    pub(crate) fn mark_processed(&mut self) {
        self.status = RecordStatus::Processed;
    }
}
