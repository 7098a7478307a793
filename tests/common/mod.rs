//! Test clips encoded on the fly with FFmpeg's built-in MPEG-4 Part 2 encoder.
//!
//! Every frame is a vertical gray ramp: row `y` has value `ramp_value(y)`,
//! so misplaced rows show up as wrong pixel values after decoding.

#![allow(dead_code)]

use std::path::Path;

use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::encoder::video::Encoder as VideoEncoder;
use ffmpeg_next::codec::{Flags as CodecFlags, Id};
use ffmpeg_next::format::{Flags as FormatFlags, Pixel, context::Output};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Packet, Rational};

/// Width of generated clips. Its RGB24 rows (210 bytes) are not a multiple
/// of FFmpeg's line alignment, so decoded frames carry row padding.
pub const CLIP_WIDTH: u32 = 70;
pub const CLIP_HEIGHT: u32 = 40;
const FPS: i32 = 30;

/// Gray level of row `y` in every generated frame.
pub fn ramp_value(y: u32) -> u8 {
    (y * 6) as u8
}

/// Encode a `frame_count`-frame clip at `path`. The container follows the
/// extension (`.mp4`, `.avi`, ...).
pub fn write_clip(path: &Path, frame_count: usize) {
    ffmpeg_next::init().expect("Failed to initialise FFmpeg");

    let mut output = ffmpeg_next::format::output(path).expect("Failed to create output");
    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);
    let codec = ffmpeg_next::encoder::find(Id::MPEG4).expect("MPEG-4 encoder unavailable");

    let mut stream = output.add_stream(codec).expect("Failed to add stream");
    let stream_index = stream.index();
    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.encoder().video())
        .expect("Failed to create encoder");
    encoder.set_width(CLIP_WIDTH);
    encoder.set_height(CLIP_HEIGHT);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(Rational::new(1, FPS));
    encoder.set_frame_rate(Some(Rational::new(FPS, 1)));
    encoder.set_bit_rate(2_000_000);
    if needs_global_header {
        encoder.set_flags(CodecFlags::GLOBAL_HEADER);
    }
    let mut encoder = encoder.open_as(codec).expect("Failed to open encoder");
    stream.set_parameters(&encoder);
    output.write_header().expect("Failed to write header");
    let stream_time_base = output
        .stream(stream_index)
        .expect("Stream vanished")
        .time_base();

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        CLIP_WIDTH,
        CLIP_HEIGHT,
        Pixel::YUV420P,
        CLIP_WIDTH,
        CLIP_HEIGHT,
        ScalingFlags::BILINEAR,
    )
    .expect("Failed to create scaler");

    for index in 0..frame_count {
        let mut rgb = VideoFrame::new(Pixel::RGB24, CLIP_WIDTH, CLIP_HEIGHT);
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for y in 0..CLIP_HEIGHT {
            let row = &mut data[y as usize * stride..][..CLIP_WIDTH as usize * 3];
            row.fill(ramp_value(y));
        }

        let mut yuv = VideoFrame::empty();
        scaler.run(&rgb, &mut yuv).expect("Failed to convert frame");
        yuv.set_pts(Some(index as i64));
        encoder.send_frame(&yuv).expect("Failed to send frame");
        drain(&mut encoder, &mut output, stream_index, stream_time_base);
    }

    encoder.send_eof().expect("Failed to flush encoder");
    drain(&mut encoder, &mut output, stream_index, stream_time_base);
    output.write_trailer().expect("Failed to write trailer");
}

fn drain(encoder: &mut VideoEncoder, output: &mut Output, stream_index: usize, time_base: Rational) {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(Rational::new(1, FPS), time_base);
        packet
            .write_interleaved(output)
            .expect("Failed to write packet");
    }
}
