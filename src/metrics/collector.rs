//! Metrics collection and registry.

use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use thiserror::Error;

use crate::analysis::QualityMetrics;
use crate::scoring::{IssueType, QualityCategory, QualityResult};

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed in the Prometheus client.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for capture quality monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    analyses_total: IntCounter,
    failures_total: IntCounter,
    cache_hits_total: IntCounter,

    // Verdicts
    last_score: Gauge,
    category_total: IntCounterVec,
    issues_total: IntCounterVec,

    // Per-metric scores of the latest analysis
    metric_score: GaugeVec,

    analysis_duration: Histogram,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all quality metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let analyses_total = IntCounter::new(
            "capture_quality_analyses_total",
            "Total number of completed analyses",
        )?;
        let failures_total = IntCounter::new(
            "capture_quality_failures_total",
            "Analyses aborted by a source error",
        )?;
        let cache_hits_total = IntCounter::new(
            "capture_quality_cache_hits_total",
            "Analyses answered from the result cache",
        )?;

        let last_score = Gauge::new(
            "capture_quality_last_score",
            "Overall score (0-100) of the latest analysis",
        )?;
        let category_total = IntCounterVec::new(
            Opts::new("capture_quality_category_total", "Verdicts by quality category"),
            &["category"],
        )?;
        let issues_total = IntCounterVec::new(
            Opts::new("capture_quality_issues_total", "Issues raised by issue type"),
            &["issue_type"],
        )?;

        let metric_score = GaugeVec::new(
            Opts::new(
                "capture_quality_metric_score",
                "Per-metric score (0-1) of the latest analysis",
            ),
            &["metric"],
        )?;

        let analysis_duration = Histogram::with_opts(
            HistogramOpts::new(
                "capture_quality_analysis_duration_seconds",
                "Wall-clock time of one analysis",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;

        registry.register(Box::new(analyses_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(last_score.clone()))?;
        registry.register(Box::new(category_total.clone()))?;
        registry.register(Box::new(issues_total.clone()))?;
        registry.register(Box::new(metric_score.clone()))?;
        registry.register(Box::new(analysis_duration.clone()))?;

        Ok(Self {
            registry,
            analyses_total,
            failures_total,
            cache_hits_total,
            last_score,
            category_total,
            issues_total,
            metric_score,
            analysis_duration,
        })
    }

    /// Records a completed analysis.
    pub fn record(&self, result: &QualityResult, metrics: &QualityMetrics, seconds: f64) {
        self.record_verdict(result);
        self.record_scores(metrics);
        self.analysis_duration.observe(seconds);
    }

    /// Records an analysis answered from the cache.
    ///
    /// Per-metric gauges only move when the cached result carries detail.
    pub fn record_cache_hit(&self, result: &QualityResult) {
        self.cache_hits_total.inc();
        self.record_verdict(result);
        if let Some(metrics) = result.metrics() {
            self.record_scores(metrics);
        }
    }

    fn record_verdict(&self, result: &QualityResult) {
        self.analyses_total.inc();
        self.last_score.set(result.score());
        self.category_total
            .with_label_values(&[result.category().as_str()])
            .inc();
        for issue in result.issues() {
            self.issues_total
                .with_label_values(&[issue.issue_type.as_str()])
                .inc();
        }
    }

    fn record_scores(&self, metrics: &QualityMetrics) {
        let [blur, lighting, composition, resolution] = metrics.scores();
        for (name, score) in [
            ("blur", blur),
            ("lighting", lighting),
            ("composition", composition),
            ("resolution", resolution),
        ] {
            self.metric_score.with_label_values(&[name]).set(score);
        }
    }

    /// Records an analysis aborted by a source error.
    pub fn record_failure(&self) {
        self.failures_total.inc();
    }

    /// Analyses answered from the cache so far.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits_total.get()
    }

    /// Completed analyses so far.
    pub fn analyses(&self) -> u64 {
        self.analyses_total.get()
    }

    /// Failed analyses so far.
    pub fn failures(&self) -> u64 {
        self.failures_total.get()
    }

    /// Issues of one type raised so far.
    pub fn issues(&self, issue_type: IssueType) -> u64 {
        self.issues_total
            .with_label_values(&[issue_type.as_str()])
            .get()
    }

    /// Verdicts of one category so far.
    pub fn verdicts(&self, category: QualityCategory) -> u64 {
        self.category_total
            .with_label_values(&[category.as_str()])
            .get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Returns a reference to the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("analyses", &self.analyses_total.get())
            .field("failures", &self.failures_total.get())
            .finish_non_exhaustive()
    }
}
