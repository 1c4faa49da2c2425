//! Benchmarks for windowed audio feature extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cliprank_audio::AudioFeatureExtractor;

fn synthetic_audio(seconds: f64, sample_rate: u32) -> Vec<f32> {
    let count = (seconds * sample_rate as f64) as usize;
    (0..count)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            // Speech-ish mixture: fundamental plus harmonics with an envelope.
            let value = (2.0 * std::f64::consts::PI * 180.0 * t).sin() * 0.5
                + (2.0 * std::f64::consts::PI * 360.0 * t).sin() * 0.25
                + (2.0 * std::f64::consts::PI * 720.0 * t).sin() * 0.125;
            (value * (0.6 + 0.4 * (2.0 * std::f64::consts::PI * 0.5 * t).sin())) as f32
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let samples = synthetic_audio(10.0, 16_000);
    let extractor = AudioFeatureExtractor::new(0.5, 0.25, 16_000);

    c.bench_function("extract_10s_16khz", |b| {
        b.iter(|| {
            let windows = extractor.extract(black_box(&samples)).unwrap();
            black_box(windows.len())
        })
    });
}

fn bench_change_points(c: &mut Criterion) {
    use cliprank_audio::{ChangePointDetector, ChangePointOptions};

    let samples = synthetic_audio(30.0, 16_000);
    let extractor = AudioFeatureExtractor::new(0.5, 0.25, 16_000);
    let windows = extractor.extract(&samples).unwrap();
    let detector = ChangePointDetector::new(ChangePointOptions::default());

    c.bench_function("change_points_30s", |b| {
        b.iter(|| black_box(detector.detect(black_box(&windows)).change_points.len()))
    });
}

criterion_group!(benches, bench_extract, bench_change_points);
criterion_main!(benches);
