//! Benchmarks for decoding, sampling, and manifest writing.
//!
//! Run with: cargo bench
//! Run with all features: cargo bench --all-features
//!
//! Decoding benchmarks encode their clip into a temporary directory first.

#[path = "../tests/common/mod.rs"]
mod common;

use std::{path::Path, sync::Arc};

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use framesieve::{
    EchoPredictor, FrameRecord, FrameSampler, FrameSource, ImageSequence, Manifest,
    ManifestWriter, Pipeline, PipelineConfig,
};
use image::{DynamicImage, RgbImage};

fn synthetic_frames(count: usize) -> Vec<DynamicImage> {
    (0..count)
        .map(|_| DynamicImage::ImageRgb8(RgbImage::new(64, 48)))
        .collect()
}

fn benchmark_decode(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    let directory = tempfile::tempdir().unwrap();
    let clip = directory.path().join("clip.mp4");
    common::write_clip(&clip, 65);

    criterion.bench_function("decode every frame of clip", |bencher| {
        bencher.iter(|| {
            let source = FrameSource::open(&clip).unwrap();
            let _count = source.count();
        });
    });
}

fn benchmark_sampling(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let frames = synthetic_frames(90);

    let mut group = criterion.benchmark_group("sample 90 synthetic frames");
    for stride in [1u64, 10, 30] {
        let sampler = FrameSampler::new(
            stride,
            directory.path(),
            directory.path(),
            Arc::new(EchoPredictor),
        )
        .unwrap();
        group.bench_function(format!("stride {stride}"), |bencher| {
            bencher.iter(|| {
                let mut sequence = ImageSequence::new(frames.clone());
                sampler.sample("bench", &mut sequence).unwrap()
            });
        });
    }
    group.finish();
}

fn benchmark_manifest(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("inspection.csv");
    let writer = ManifestWriter::new(&path);

    criterion.bench_function("write 1000 row manifest", |bencher| {
        bencher.iter(|| {
            let mut manifest = Manifest::new();
            for ordinal in 0..10 {
                let stem = format!("video_{ordinal}");
                let records = (0..100)
                    .map(|index| {
                        FrameRecord::sampled(
                            &stem,
                            index * 30,
                            Path::new("frames"),
                            Path::new("predict"),
                        )
                    })
                    .collect();
                manifest.add_video(ordinal, records);
            }
            writer.write(&mut manifest).unwrap()
        });
    });
}

fn benchmark_pipeline(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let config = PipelineConfig::rooted_at(directory.path());
    std::fs::create_dir_all(&config.video_dir).unwrap();
    common::write_clip(&config.video_dir.join("clip.mp4"), 65);

    criterion.bench_function("full pipeline run (one clip)", |bencher| {
        bencher.iter(|| Pipeline::new(config.clone()).run().unwrap());
    });
}

criterion::criterion_group!(
    benches,
    benchmark_decode,
    benchmark_sampling,
    benchmark_manifest,
    benchmark_pipeline,
);
criterion::criterion_main!(benches);
