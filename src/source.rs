//! Lazy, pull-based frame decoding.
//!
//! [`FrameSource`] wraps one video file. Each [`advance`](FrameSequence::advance)
//! reads and decodes just enough packets to produce the next frame in
//! presentation order. Conversion to an RGB image only happens when the
//! caller asks for it through [`current_image`](FrameSequence::current_image),
//! so frames skipped by the sampler are never scaled or copied.
//!
//! The sequence is finite and cannot be restarted. Clean end-of-stream and a
//! mid-stream decode failure both end it; the reason for an early stop is
//! kept in [`FrameSource::stopped_early`] for diagnostics.
//!
//! # Example
//!
//! ```no_run
//! use framesieve::FrameSource;
//!
//! let source = FrameSource::open("videos/clip.mp4")?;
//! for (index, image) in source.step_by(30) {
//!     image.save(format!("frame_{index}.png"))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::PipelineError;

/// A finite sequence of decoded frames consumed by the sampler.
pub trait FrameSequence {
    /// Move to the next frame. Returns `false` once the sequence is over,
    /// and keeps returning `false` afterwards.
    fn advance(&mut self) -> bool;

    /// Materialise the frame reached by the last successful
    /// [`advance`](FrameSequence::advance).
    fn current_image(&mut self) -> Result<DynamicImage, PipelineError>;
}

/// The stem (file name without extension) identifying a video.
pub fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An opened video file decoding frames on demand.
///
/// The demuxer is released as soon as the sequence is exhausted; dropping the
/// source releases everything else.
pub struct FrameSource {
    path: PathBuf,
    stem: String,
    input: Option<Input>,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    frames_decoded: u64,
    eof_sent: bool,
    stopped_early: Option<String>,
}

impl FrameSource {
    /// Open `path` and prepare a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// [`PipelineError::FileOpen`] when the container or codec cannot be
    /// opened, [`PipelineError::NoVideoStream`] when there is nothing to
    /// decode. Both are input failures: callers skip the video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init().map_err(|error| PipelineError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| PipelineError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let (stream_index, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| PipelineError::NoVideoStream { path: path.clone() })?;
            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| PipelineError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;
            (stream.index(), decoder)
        };

        Ok(Self {
            stem: video_stem(&path),
            path,
            input: Some(input),
            decoder,
            scaler: None,
            stream_index,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            frames_decoded: 0,
            eof_sent: false,
            stopped_early: None,
        })
    }

    /// Path the video was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension; names the output images.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Frames decoded so far, selected or not.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Why the sequence ended before end-of-stream, if it did.
    pub fn stopped_early(&self) -> Option<&str> {
        self.stopped_early.as_deref()
    }

    fn is_exhausted(&self) -> bool {
        self.input.is_none()
    }

    fn release(&mut self) {
        if self.input.take().is_some() {
            log::debug!(
                "Released {} after {} frames",
                self.path.display(),
                self.frames_decoded
            );
        }
    }

    fn stop_early(&mut self, reason: String) {
        log::warn!(
            "Stopped reading {} after {} frames: {reason}",
            self.path.display(),
            self.frames_decoded
        );
        self.stopped_early = Some(reason);
        self.release();
    }
}

impl FrameSequence for FrameSource {
    fn advance(&mut self) -> bool {
        loop {
            if self.is_exhausted() {
                return false;
            }

            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                self.frames_decoded += 1;
                return true;
            }

            if self.eof_sent {
                self.release();
                return false;
            }

            let Some(input) = self.input.as_mut() else {
                return false;
            };
            let mut packet = Packet::empty();
            match packet.read(input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.stop_early(format!("decoder rejected packet: {error}"));
                            return false;
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.stop_early(format!("failed to flush decoder: {error}"));
                        return false;
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.stop_early(format!("failed to read packet: {error}"));
                    return false;
                }
            }
        }
    }

    fn current_image(&mut self) -> Result<DynamicImage, PipelineError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();
        if width == 0 || height == 0 {
            return Err(PipelineError::VideoDecodeError(
                "no decoded frame is available".to_string(),
            ));
        }

        // Streams may change resolution mid-way; rebuild the scaler when they do.
        let stale = self.scaler.as_ref().is_none_or(|scaler| {
            let definition = scaler.input();
            definition.format != format || definition.width != width || definition.height != height
        });
        if stale {
            self.scaler = Some(ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(PipelineError::VideoDecodeError(
                "scaler is unavailable".to_string(),
            ));
        };
        if stale {
            self.rgb_frame = VideoFrame::empty();
        }
        scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        let buffer = packed_rgb(&self.rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| {
                PipelineError::VideoDecodeError(
                    "Failed to construct RGB image from decoded frame data".to_string(),
                )
            })
    }
}

impl Iterator for FrameSource {
    type Item = (u64, DynamicImage);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.advance() {
            return None;
        }
        let index = self.frames_decoded - 1;
        match self.current_image() {
            Ok(image) => Some((index, image)),
            Err(error) => {
                self.stop_early(error.to_string());
                None
            }
        }
    }
}

/// Copy an RGB24 frame into a tightly packed buffer, dropping row padding.
fn packed_rgb(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * height as usize].to_vec();
    }
    data.chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

/// Adapts an iterator of already-decoded images into a [`FrameSequence`].
///
/// Useful when frames come from somewhere other than a video file. Each
/// frame can be materialised once.
///
/// ```
/// use framesieve::{FrameSequence, ImageSequence};
/// use image::{DynamicImage, RgbImage};
///
/// let frames = (0..3).map(|_| DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
/// let mut sequence = ImageSequence::new(frames);
/// assert!(sequence.advance());
/// assert!(sequence.current_image().is_ok());
/// ```
pub struct ImageSequence<I> {
    frames: I,
    current: Option<DynamicImage>,
    finished: bool,
}

impl<I> ImageSequence<I>
where
    I: Iterator<Item = DynamicImage>,
{
    /// Wrap `frames`, yielded in order.
    pub fn new<T>(frames: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            frames: frames.into_iter(),
            current: None,
            finished: false,
        }
    }
}

impl<I> FrameSequence for ImageSequence<I>
where
    I: Iterator<Item = DynamicImage>,
{
    fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.current = self.frames.next();
        self.finished = self.current.is_none();
        !self.finished
    }

    fn current_image(&mut self) -> Result<DynamicImage, PipelineError> {
        self.current.take().ok_or_else(|| {
            PipelineError::VideoDecodeError("no current frame in sequence".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::{DynamicImage, RgbImage};

    use super::*;

    #[test]
    fn stem_drops_directory_and_extension() {
        assert_eq!(video_stem(Path::new("videos/clip.mp4")), "clip");
        assert_eq!(video_stem(Path::new("videos/take.2.avi")), "take.2");
    }

    #[test]
    fn image_sequence_is_finite_and_not_restartable() {
        let frames = vec![DynamicImage::ImageRgb8(RgbImage::new(1, 1))];
        let mut sequence = ImageSequence::new(frames);
        assert!(sequence.advance());
        assert!(!sequence.advance());
        assert!(!sequence.advance());
        assert!(sequence.current_image().is_err());
    }

    #[test]
    fn opening_a_missing_file_is_an_input_failure() {
        let result = FrameSource::open("this_video_does_not_exist.mp4");
        let error = result.err().expect("open should fail");
        assert!(error.is_input_failure());
        assert!(error.to_string().contains("Failed to open video file"));
    }
}
