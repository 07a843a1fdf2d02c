//! Prometheus metrics for capture quality monitoring.
//!
//! A [`MetricsRegistry`] attached to a validator records every analysis.
//! With the `metrics` feature it can be served over HTTP.
//!
//! # Metrics Exposed
//!
//! - `capture_quality_analyses_total` - Completed analyses
//! - `capture_quality_failures_total` - Analyses aborted by a source error
//! - `capture_quality_cache_hits_total` - Analyses answered from the cache
//! - `capture_quality_last_score` - Overall score of the latest analysis
//! - `capture_quality_category_total{category}` - Verdicts per category
//! - `capture_quality_issues_total{issue_type}` - Issues per metric
//! - `capture_quality_metric_score{metric}` - Latest per-metric scores
//! - `capture_quality_analysis_duration_seconds` - Analysis latency histogram
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use capture_quality::metrics::MetricsRegistry;
//! use capture_quality::{QualityThresholds, Validator};
//!
//! let registry = Arc::new(MetricsRegistry::new().expect("Failed to create registry"));
//! let validator = Validator::new(QualityThresholds::default()).with_metrics(Arc::clone(&registry));
//! // ... analyze frames ...
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
