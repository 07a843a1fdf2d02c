use std::hint::black_box;

use capture_quality::analysis::blur::estimate_blur;
use capture_quality::analysis::{BlurMethod, BlurOptions};
use capture_quality::capture::{Camera, CaptureConfig, MockCamera};
use capture_quality::pixels::GrayscaleBuffer;
use capture_quality::{
    AnalysisOptions, CaptureMode, FrameSource, PixelBuffer, QualityThresholds, Validator,
    ValidatorConfig,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

const SIZES: [(u32, u32); 3] = [(320, 240), (1280, 960), (3024, 4032)];

fn checkerboard(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::filled(width, height, [128, 128, 128, 255]);
    for y in height / 4..height - height / 4 {
        for x in width / 4..width - width / 4 {
            let v = if (x / 8 + y / 8) % 2 == 0 { 210 } else { 60 };
            buf.set_pixel(x, y, [v, v, v, 255]);
        }
    }
    buf
}

fn uncached_validator() -> Validator {
    Validator::with_config(
        ValidatorConfig {
            cache_capacity: 0,
            ..ValidatorConfig::default()
        },
        QualityThresholds::default(),
    )
}

fn benchmark_analyze_image(c: &mut Criterion) {
    let validator = uncached_validator();
    let options = AnalysisOptions {
        mode: CaptureMode::Tongue,
        detailed: true,
        ..AnalysisOptions::default()
    };

    let mut group = c.benchmark_group("analyze_image");
    for (width, height) in SIZES {
        let buf = checkerboard(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &buf,
            |b, buf| {
                b.iter(|| {
                    validator
                        .analyze_image(FrameSource::Canonical(black_box(buf)), &options)
                        .expect("synthetic buffer should analyze");
                });
            },
        );
    }
    group.finish();
}

fn benchmark_blur_methods(c: &mut Criterion) {
    let gray = GrayscaleBuffer::from_pixels(&checkerboard(1024, 768));
    let configs = [
        ("laplacian", BlurMethod::Laplacian, false),
        ("laplacian_regional", BlurMethod::Laplacian, true),
        ("sobel", BlurMethod::Sobel, false),
        ("gradient", BlurMethod::Gradient, false),
        ("auto", BlurMethod::Auto, false),
    ];

    let mut group = c.benchmark_group("blur");
    for (label, method, regional_sampling) in configs {
        let options = BlurOptions {
            method,
            regional_sampling,
            compute_confidence: method == BlurMethod::Auto,
        };
        group.bench_with_input(BenchmarkId::from_parameter(label), &options, |b, opts| {
            b.iter(|| estimate_blur(black_box(&gray), opts));
        });
    }
    group.finish();
}

fn benchmark_assess_frame(c: &mut Criterion) {
    let validator = uncached_validator();
    let mut camera = MockCamera::new();
    camera
        .open(&CaptureConfig::with_dimensions(1280, 720))
        .expect("mock camera should open");
    let frame = camera.capture().expect("mock camera should capture");

    c.bench_function("assess_frame_1280x720", |b| {
        b.iter(|| {
            validator
                .assess_frame(black_box(&frame), CaptureMode::Face)
                .expect("mock frame should assess");
        });
    });
}

criterion_group!(
    benches,
    benchmark_analyze_image,
    benchmark_blur_methods,
    benchmark_assess_frame
);
criterion_main!(benches);
