//! Stride-based frame selection.
//!
//! [`FrameSampler`] walks a [`FrameSequence`], counting every frame it sees,
//! and keeps the frames whose index is a multiple of the stride. Each kept
//! frame is written to the frame directory, handed to the [`Predictor`], and
//! the prediction is written to the prediction directory. The result is one
//! [`FrameRecord`] per kept frame, in ascending index order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};

use crate::configuration::PipelineConfig;
use crate::error::PipelineError;
use crate::predictor::Predictor;
use crate::record::FrameRecord;
use crate::source::FrameSequence;

/// Records produced for one video.
#[derive(Debug, Clone, Default)]
pub struct SampledVideo {
    /// One record per selected frame, ascending by index.
    pub records: Vec<FrameRecord>,
    /// Every frame observed, selected or not.
    pub frames_seen: u64,
}

/// Selects every Nth frame and writes the frame and prediction images.
#[derive(Clone)]
pub struct FrameSampler {
    stride: u64,
    frame_dir: PathBuf,
    predict_dir: PathBuf,
    predictor: Arc<dyn Predictor>,
}

impl FrameSampler {
    /// Create a sampler writing into `frame_dir` and `predict_dir`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidStride`] if `stride` is zero.
    pub fn new<P, Q>(
        stride: u64,
        frame_dir: P,
        predict_dir: Q,
        predictor: Arc<dyn Predictor>,
    ) -> Result<Self, PipelineError>
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        if stride == 0 {
            return Err(PipelineError::InvalidStride);
        }
        Ok(Self {
            stride,
            frame_dir: frame_dir.into(),
            predict_dir: predict_dir.into(),
            predictor,
        })
    }

    /// Create a sampler from the stride and directories of `config`.
    pub fn from_config(
        config: &PipelineConfig,
        predictor: Arc<dyn Predictor>,
    ) -> Result<Self, PipelineError> {
        Self::new(
            config.frame_stride,
            &config.frame_dir,
            &config.predict_dir,
            predictor,
        )
    }

    /// Interval between sampled frames.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Whether frame `index` is kept.
    pub fn is_selected(&self, index: u64) -> bool {
        index % self.stride == 0
    }

    /// Sample `frames`, naming outputs after `stem`.
    ///
    /// A sequence with no frames yields no records. A sequence shorter than
    /// one stride still yields frame 0.
    ///
    /// # Errors
    ///
    /// Image writes and predictor failures abort sampling. A frame that
    /// cannot be materialised ends the sequence early, like a decode error
    /// would; the records gathered up to that point are kept.
    pub fn sample<S>(&self, stem: &str, frames: &mut S) -> Result<SampledVideo, PipelineError>
    where
        S: FrameSequence + ?Sized,
    {
        let mut sampled = SampledVideo::default();

        while frames.advance() {
            let index = sampled.frames_seen;
            sampled.frames_seen += 1;

            if !self.is_selected(index) {
                continue;
            }

            let frame = match frames.current_image() {
                Ok(frame) => frame,
                Err(error) => {
                    log::warn!("Stopped sampling {stem} at frame {index}: {error}");
                    break;
                }
            };

            sampled.records.push(self.emit(stem, index, &frame)?);
        }

        Ok(sampled)
    }

    fn emit(&self, stem: &str, index: u64, frame: &DynamicImage) -> Result<FrameRecord, PipelineError> {
        let record = FrameRecord::sampled(stem, index, &self.frame_dir, &self.predict_dir);

        write_jpeg(frame, record.frame_path())?;

        let prediction =
            self.predictor
                .predict(frame)
                .map_err(|reason| PipelineError::Prediction {
                    video: stem.to_string(),
                    frame: index,
                    reason,
                })?;
        write_jpeg(&prediction, record.predict_path())?;

        log::debug!("Sampled {stem} frame {index}");
        Ok(record)
    }
}

/// Encode `image` as JPEG at `path`, converting colour types JPEG lacks.
fn write_jpeg(image: &DynamicImage, path: &Path) -> Result<(), PipelineError> {
    let result = match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => {
            image.save_with_format(path, ImageFormat::Jpeg)
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()).save_with_format(path, ImageFormat::Jpeg),
    };
    result.map_err(|source| PipelineError::FrameWrite {
        path: path.to_path_buf(),
        source,
    })
}
