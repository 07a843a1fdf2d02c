//! Invariants that hold for arbitrary inputs.

use capture_quality::analysis::blur::{self, consensus_confidence, estimate_blur};
use capture_quality::analysis::lighting::analyze_lighting;
use capture_quality::analysis::{BlurOptions, LightingThresholds};
use capture_quality::pixels::{Channel, GrayscaleBuffer, Histogram};
use capture_quality::{
    AnalysisOptions, CaptureMode, FrameSource, PixelBuffer, QualityThresholds, Roi, Validator,
    ValidatorConfig,
};
use proptest::prelude::*;

fn step_edge(contrast: u8) -> GrayscaleBuffer {
    let mut buf = PixelBuffer::filled(32, 32, [0, 0, 0, 255]);
    for y in 0..32 {
        for x in 16..32 {
            buf.set_pixel(x, y, [contrast, contrast, contrast, 255]);
        }
    }
    GrayscaleBuffer::from_pixels(&buf)
}

fn mode_strategy() -> impl Strategy<Value = CaptureMode> {
    prop_oneof![
        Just(CaptureMode::Tongue),
        Just(CaptureMode::Face),
        Just(CaptureMode::Body),
        Just(CaptureMode::General),
    ]
}

fn noisy_buffer() -> impl Strategy<Value = PixelBuffer> {
    (4u32..48, 4u32..48).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |samples| PixelBuffer::from_rgba(w, h, samples).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_scores_stay_in_range(buf in noisy_buffer(), mode in mode_strategy(), regional in any::<bool>()) {
        let validator = Validator::with_config(
            ValidatorConfig { cache_capacity: 0, ..ValidatorConfig::default() },
            QualityThresholds::default(),
        );
        let options = AnalysisOptions {
            mode,
            detailed: true,
            regional_sampling: regional,
            ..AnalysisOptions::default()
        };
        let result = validator.analyze_image(FrameSource::Canonical(&buf), &options).unwrap();

        prop_assert!((0.0..=100.0).contains(&result.score()));
        for score in result.metrics().unwrap().scores() {
            prop_assert!((0.0..=1.0).contains(&score));
        }
        for issue in result.issues() {
            prop_assert!((0.0..=1.0).contains(&issue.confidence));
        }
        prop_assert!(!result.suggestions().is_empty());
    }

    #[test]
    fn prop_laplacian_grows_with_edge_contrast(a in any::<u8>(), b in any::<u8>()) {
        let (lo, hi) = (a.min(b), a.max(b));
        let weak = blur::laplacian(&step_edge(lo));
        let strong = blur::laplacian(&step_edge(hi));
        prop_assert!(weak.raw <= strong.raw);
        prop_assert!(weak.score <= strong.score);
    }

    #[test]
    fn prop_flat_image_has_no_sharpness(v in any::<u8>(), w in 3u32..64, h in 3u32..64) {
        let gray = GrayscaleBuffer::from_pixels(&PixelBuffer::filled(w, h, [v, v, v, 255]));
        let metrics = estimate_blur(&gray, &BlurOptions::default());
        prop_assert_eq!(metrics.variance, 0.0);
        prop_assert_eq!(metrics.score, 0.0);
    }

    #[test]
    fn prop_histogram_counts_every_pixel(buf in noisy_buffer()) {
        let expected = buf.pixel_count() as u64;
        for channel in [Channel::Luminance, Channel::Red, Channel::Alpha] {
            let hist = Histogram::from_pixels(&buf, channel);
            prop_assert_eq!(hist.total(), expected);
            prop_assert_eq!(hist.bins().iter().sum::<u64>(), expected);
        }
    }

    #[test]
    fn prop_region_outside_frame_is_empty(
        w in 1u32..64,
        h in 1u32..64,
        dx in 0u32..32,
        dy in 0u32..32,
        rw in 1u32..32,
        rh in 1u32..32,
    ) {
        let buf = PixelBuffer::filled(w, h, [9, 9, 9, 255]);
        let region = buf.extract_region(Roi::new(w + dx, dy, rw, rh));
        prop_assert_eq!(region.pixel_count(), 0);
        let region = buf.extract_region(Roi::new(dx, h + dy, rw, rh));
        prop_assert_eq!(region.pixel_count(), 0);
    }

    #[test]
    fn prop_uniform_gray_lighting(v in any::<u8>(), w in 1u32..32, h in 1u32..32) {
        let buf = PixelBuffer::filled(w, h, [v, v, v, 255]);
        let hist = Histogram::from_pixels(&buf, Channel::Luminance);
        let metrics = analyze_lighting(&hist, &LightingThresholds::default());
        prop_assert!((metrics.brightness - v as f64).abs() < 1e-9);
        prop_assert_eq!(metrics.contrast, 0.0);
        prop_assert!((0.0..=1.0).contains(&metrics.score));
    }

    #[test]
    fn prop_agreeing_decisive_scores_are_confident(
        a in prop_oneof![0.0f64..=0.38, 0.57f64..=0.95],
        d1 in 0.0f64..0.05,
        d2 in 0.0f64..0.05,
    ) {
        let scores = [a, a + d1, a + d2];
        let primary = 0.5 * scores[0] + 0.3 * scores[1] + 0.2 * scores[2];
        prop_assert!(consensus_confidence(scores, primary) >= 0.7);
    }
}
