//! The quality validator: source in, verdict out.
//!
//! ```text
//! acquire → downscale → grayscale ─┬─ blur ───────┐
//!                                   ├─ lighting ───┤
//!                                   └─ composition ┼─ scoring → QualityResult
//!               source dimensions ── resolution ───┘
//! ```
//!
//! Thresholds are held behind an `RwLock<Arc<_>>`: each call clones the `Arc`
//! once up front and works from that snapshot, so a concurrent
//! [`Validator::update_thresholds`] never tears a running analysis.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::lighting::{analyze_regions, face_zones};
use crate::analysis::{
    BlurEstimator, BlurMethod, BlurOptions, CaptureMode, CompositionEstimator,
    ConsensusBlurEstimator, HistogramLightingEstimator, InvalidThreshold, LightingEstimator,
    PixelCountResolutionEstimator, QualityMetrics, QualityThresholds, ResolutionEstimator,
    SalienceCompositionEstimator, ThresholdsUpdate,
};
use crate::capture::Frame;
use crate::metrics::MetricsRegistry;
use crate::pixels::{acquire, FrameSource, PixelBuffer, Roi, SourceError};
use crate::scoring::{self, QualityResult, ResultMetadata};

/// Construction-time validator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Frames larger than this on either side are downscaled before the
    /// convolution passes.
    pub max_analysis_dimension: u32,
    /// Downscale target for [`Validator::assess_frame`].
    pub live_max_dimension: u32,
    /// Result cache entries; 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_analysis_dimension: 1024,
            live_max_dimension: 320,
            cache_capacity: 32,
        }
    }
}

/// Per-call analysis options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub mode: CaptureMode,
    /// Attach per-metric detail to the result.
    pub detailed: bool,
    /// Five-region Laplacian sampling.
    pub regional_sampling: bool,
    /// Method reported as the blur score.
    pub blur_method: BlurMethod,
    /// Subject region in source pixels, replacing salience detection.
    pub subject_hint: Option<Roi>,
    /// Record duration and timestamp in the metadata. Timed results are
    /// never cached.
    pub include_timing: bool,
}

impl AnalysisOptions {
    /// Default options for `mode`.
    pub fn for_mode(mode: CaptureMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// The estimators a validator runs.
pub struct Estimators {
    /// Sharpness.
    pub blur: Box<dyn BlurEstimator>,
    /// Brightness and exposure.
    pub lighting: Box<dyn LightingEstimator>,
    /// Subject placement.
    pub composition: Box<dyn CompositionEstimator>,
    /// Pixel-count adequacy.
    pub resolution: Box<dyn ResolutionEstimator>,
}

impl Default for Estimators {
    fn default() -> Self {
        Self {
            blur: Box::new(ConsensusBlurEstimator),
            lighting: Box::new(HistogramLightingEstimator),
            composition: Box::new(SalienceCompositionEstimator),
            resolution: Box::new(PixelCountResolutionEstimator),
        }
    }
}

struct ThresholdState {
    current: Arc<QualityThresholds>,
    generation: u64,
}

type CacheKey = [u8; 32];

/// Bounded FIFO of results for one threshold generation.
struct ResultCache {
    capacity: usize,
    generation: u64,
    entries: HashMap<CacheKey, QualityResult>,
    order: VecDeque<CacheKey>,
}

impl ResultCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            generation: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &CacheKey, generation: u64) -> Option<&QualityResult> {
        if generation != self.generation {
            return None;
        }
        self.entries.get(key)
    }

    fn insert(&mut self, key: CacheKey, generation: u64, result: QualityResult) {
        // A result computed under superseded thresholds is dropped.
        if self.capacity == 0 || generation != self.generation {
            return;
        }
        if self.entries.insert(key, result).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn invalidate(&mut self, generation: u64) {
        self.generation = generation;
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Orchestrates acquisition, estimation and scoring.
///
/// `Send + Sync`; share it behind an `Arc` to analyze from several threads.
pub struct Validator {
    config: ValidatorConfig,
    thresholds: RwLock<ThresholdState>,
    estimators: Estimators,
    cache: Mutex<ResultCache>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Validator {
    /// Creates a validator with default settings and estimators.
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self::with_config(ValidatorConfig::default(), thresholds)
    }

    /// Creates a validator with explicit settings.
    pub fn with_config(config: ValidatorConfig, thresholds: QualityThresholds) -> Self {
        Self::with_estimators(config, thresholds, Estimators::default())
    }

    /// Creates a validator running injected estimators.
    pub fn with_estimators(
        config: ValidatorConfig,
        thresholds: QualityThresholds,
        estimators: Estimators,
    ) -> Self {
        Self {
            config,
            thresholds: RwLock::new(ThresholdState {
                current: Arc::new(thresholds),
                generation: 0,
            }),
            estimators,
            cache: Mutex::new(ResultCache::new(config.cache_capacity)),
            metrics: None,
        }
    }

    /// Records every analysis into `registry`.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Engine configuration.
    #[inline]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Snapshot of the current thresholds.
    pub fn thresholds(&self) -> Arc<QualityThresholds> {
        self.snapshot().0
    }

    fn snapshot(&self) -> (Arc<QualityThresholds>, u64) {
        let state = self.thresholds.read().unwrap_or_else(|e| e.into_inner());
        (Arc::clone(&state.current), state.generation)
    }

    /// Full pipeline on any supported source.
    ///
    /// Only acquisition can fail; estimator edge cases degrade to
    /// worst-case scores.
    pub fn analyze_image(
        &self,
        source: FrameSource<'_>,
        options: &AnalysisOptions,
    ) -> Result<QualityResult, SourceError> {
        let started = Instant::now();
        let (thresholds, generation) = self.snapshot();
        let buf = self.acquire(source)?;

        let key = (self.config.cache_capacity > 0 && !options.include_timing)
            .then(|| cache_key(&buf, options));
        if let Some(key) = &key {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(key, generation) {
                tracing::debug!(mode = %options.mode, "Result served from cache");
                if let Some(registry) = &self.metrics {
                    registry.record_cache_hit(hit);
                }
                return Ok(hit.clone());
            }
        }

        let result = self.evaluate(
            &buf,
            options,
            &thresholds,
            self.config.max_analysis_dimension,
            started,
        );

        if let Some(key) = key {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.insert(key, generation, result.clone());
        }
        Ok(result)
    }

    /// Live fast path for a throttled preview loop.
    ///
    /// Downscales to [`ValidatorConfig::live_max_dimension`], skips regional
    /// sampling and detail, and never touches the cache.
    pub fn assess_frame(
        &self,
        frame: &Frame,
        mode: CaptureMode,
    ) -> Result<QualityResult, SourceError> {
        let started = Instant::now();
        let (thresholds, _) = self.snapshot();
        let buf = self.acquire(FrameSource::Live(frame))?;
        let options = AnalysisOptions::for_mode(mode);
        let result = self.evaluate(
            &buf,
            &options,
            &thresholds,
            self.config.live_max_dimension,
            started,
        );
        tracing::debug!(
            sequence = frame.sequence(),
            score = result.score(),
            category = %result.category(),
            "Frame assessed"
        );
        Ok(result)
    }

    /// Raw metric vectors without a verdict.
    pub fn quality_metrics(
        &self,
        source: FrameSource<'_>,
        options: &AnalysisOptions,
    ) -> Result<QualityMetrics, SourceError> {
        let (thresholds, _) = self.snapshot();
        let buf = self.acquire(source)?;
        let (metrics, _) = self.measure(
            &buf,
            options,
            &thresholds,
            self.config.max_analysis_dimension,
        );
        Ok(metrics)
    }

    /// Merges `update` into the current thresholds.
    ///
    /// The merged table is validated first; on error nothing changes. Calls
    /// already running keep their snapshot. The result cache is cleared when
    /// the effective thresholds change.
    pub fn update_thresholds(&self, update: &ThresholdsUpdate) -> Result<(), InvalidThreshold> {
        let mut state = self.thresholds.write().unwrap_or_else(|e| e.into_inner());
        let merged = state.current.merged(update);
        merged.validate()?;
        if merged == *state.current {
            tracing::debug!("Threshold update left thresholds unchanged");
            return Ok(());
        }

        state.current = Arc::new(merged);
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = cache.len();
        cache.invalidate(generation);
        tracing::info!(generation, dropped, "Thresholds updated, result cache invalidated");
        Ok(())
    }

    /// Releases cached results. Safe to call repeatedly.
    pub fn dispose(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let generation = cache.generation;
        let dropped = cache.len();
        cache.invalidate(generation);
        cache.entries.shrink_to_fit();
        cache.order.shrink_to_fit();
        if dropped > 0 {
            tracing::debug!(dropped, "Validator cache released");
        }
    }

    /// Number of cached results.
    pub fn cached_results(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn acquire(&self, source: FrameSource<'_>) -> Result<PixelBuffer, SourceError> {
        let kind = source.kind();
        acquire(source).map_err(|e| {
            tracing::debug!(source = kind, error = %e, "Source acquisition failed");
            if let Some(registry) = &self.metrics {
                registry.record_failure();
            }
            e
        })
    }

    /// Runs the four estimators over `buf`.
    fn measure(
        &self,
        buf: &PixelBuffer,
        options: &AnalysisOptions,
        thresholds: &QualityThresholds,
        max_dimension: u32,
    ) -> (QualityMetrics, (u32, u32)) {
        let analysed = buf.downscale_to_fit(max_dimension);
        let gray = analysed.to_grayscale();
        let blur_options = BlurOptions {
            method: options.blur_method,
            regional_sampling: options.regional_sampling,
            compute_confidence: true,
        };

        let (blur, mut lighting) = rayon::join(
            || self.estimators.blur.estimate(&gray, &blur_options),
            || self.estimators.lighting.estimate(&gray, &thresholds.lighting),
        );
        if options.detailed && options.mode == CaptureMode::Face {
            lighting.zones = analyze_regions(&analysed, &face_zones(), &thresholds.lighting);
        }

        let hint = options
            .subject_hint
            .map(|roi| scale_roi(roi, buf.dimensions(), analysed.dimensions()));
        let composition = self.estimators.composition.estimate(
            &gray,
            thresholds.expected_region(options.mode),
            hint,
        );
        let resolution = self.estimators.resolution.estimate(
            buf.width(),
            buf.height(),
            &thresholds.resolution_for(options.mode),
        );

        let metrics = QualityMetrics {
            blur,
            lighting,
            composition,
            resolution,
        };
        (metrics, analysed.dimensions())
    }

    fn evaluate(
        &self,
        buf: &PixelBuffer,
        options: &AnalysisOptions,
        thresholds: &QualityThresholds,
        max_dimension: u32,
        started: Instant,
    ) -> QualityResult {
        let (metrics, (analyzed_width, analyzed_height)) =
            self.measure(buf, options, thresholds, max_dimension);

        let mode = options.mode;
        let score = scoring::overall_score(&metrics, &thresholds.weights_for(mode));
        let category = scoring::category(score, &thresholds.categories);
        let issues = scoring::issues(&metrics, thresholds, mode);
        let suggestions = scoring::suggestions(&issues, mode);

        let elapsed = started.elapsed();
        let metadata = ResultMetadata {
            mode,
            source_width: buf.width(),
            source_height: buf.height(),
            analyzed_width,
            analyzed_height,
            duration_ms: options
                .include_timing
                .then(|| elapsed.as_secs_f64() * 1000.0),
            analyzed_at: options.include_timing.then(Utc::now),
        };

        tracing::debug!(
            mode = %mode,
            score,
            category = %category,
            issues = issues.len(),
            "Analysis complete"
        );

        let result = QualityResult::new(
            category,
            score,
            issues,
            suggestions,
            Some(metadata),
            options.detailed.then(|| metrics.clone()),
        );
        if let Some(registry) = &self.metrics {
            registry.record(&result, &metrics, elapsed.as_secs_f64());
        }
        result
    }

    /// Runs [`Validator::analyze_image`] on tokio's blocking pool.
    #[cfg(feature = "async")]
    pub async fn analyze_image_async(
        self: Arc<Self>,
        source: crate::pixels::OwnedSource,
        options: AnalysisOptions,
    ) -> Result<QualityResult, SourceError> {
        tokio::task::spawn_blocking(move || self.analyze_image(source.as_source(), &options))
            .await
            .map_err(|e| SourceError::Environment(format!("analysis task failed: {}", e)))?
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("cached_results", &self.cached_results())
            .finish_non_exhaustive()
    }
}

/// Maps a source-pixel region into the analysed buffer's coordinates.
fn scale_roi(roi: Roi, from: (u32, u32), to: (u32, u32)) -> Roi {
    if from == to || from.0 == 0 || from.1 == 0 {
        return roi;
    }
    let sx = to.0 as f64 / from.0 as f64;
    let sy = to.1 as f64 / from.1 as f64;
    Roi::new(
        (roi.x as f64 * sx).round() as u32,
        (roi.y as f64 * sy).round() as u32,
        (roi.width as f64 * sx).round() as u32,
        (roi.height as f64 * sy).round() as u32,
    )
}

/// BLAKE3 over dimensions, pixels and every option that affects the result.
fn cache_key(buf: &PixelBuffer, options: &AnalysisOptions) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&buf.width().to_le_bytes());
    hasher.update(&buf.height().to_le_bytes());
    hasher.update(buf.samples());
    hasher.update(options.mode.as_str().as_bytes());
    hasher.update(&[
        options.detailed as u8,
        options.regional_sampling as u8,
        options.blur_method as u8,
    ]);
    match options.subject_hint {
        Some(roi) => {
            hasher.update(&[1]);
            for v in [roi.x, roi.y, roi.width, roi.height] {
                hasher.update(&v.to_le_bytes());
            }
        }
        None => {
            hasher.update(&[0]);
        }
    }
    *hasher.finalize().as_bytes()
}
