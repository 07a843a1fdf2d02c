//! Prometheus scrape endpoint plus a plain-text verdict summary.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::metrics::MetricsRegistry;
use crate::scoring::{IssueType, QualityCategory};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Metrics endpoint failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("cannot listen for scrapes: {0}")]
    Bind(#[from] std::io::Error),

    /// The server loop exited with an error.
    #[error("metrics endpoint stopped: {0}")]
    Serve(String),
}

/// Where and how the metrics endpoint listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Loopback by default; capture devices rarely want to expose this.
    pub bind_addr: SocketAddr,
    /// Allow cross-origin scrapes from browser dashboards.
    pub permissive_cors: bool,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Loopback on `port`, CORS disabled.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
            permissive_cors: false,
        }
    }
}

/// Serves a [`MetricsRegistry`] that a validator records into.
///
/// Routes: `/metrics` (Prometheus text format), `/verdicts` (human-readable
/// tallies) and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Arc<MetricsRegistry>,
}

impl MetricsServer {
    /// Server over `registry`; nothing is bound until [`run`](Self::run).
    pub fn new(config: MetricsServerConfig, registry: Arc<MetricsRegistry>) -> Self {
        Self { config, registry }
    }

    /// Router over the shared registry, unbound.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/metrics", get(scrape))
            .route("/verdicts", get(verdicts))
            .route("/health", get(health))
            .with_state(Arc::clone(&self.registry));
        if self.config.permissive_cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Binds and serves until the task is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Serving capture quality metrics");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

async fn scrape(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    match registry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        ),
        Err(e) => {
            tracing::warn!("Metrics encoding failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                e.to_string(),
            )
        }
    }
}

async fn verdicts(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        verdict_summary(&registry),
    )
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Tallies per category and issue type, with the share of captures that
/// would have prompted a retake.
pub(crate) fn verdict_summary(registry: &MetricsRegistry) -> String {
    let analyses = registry.analyses();
    let mut out = String::new();
    let _ = writeln!(out, "analyses {}", analyses);
    let _ = writeln!(out, "failures {}", registry.failures());

    let mut retakes = 0;
    for category in [
        QualityCategory::Excellent,
        QualityCategory::Good,
        QualityCategory::Fair,
        QualityCategory::Poor,
    ] {
        let n = registry.verdicts(category);
        if category <= QualityCategory::Fair {
            retakes += n;
        }
        let _ = writeln!(out, "{:<10} {}", category.as_str(), n);
    }
    for issue_type in [
        IssueType::Blur,
        IssueType::Lighting,
        IssueType::Composition,
        IssueType::Resolution,
    ] {
        let _ = writeln!(out, "issue {:<12} {}", issue_type.as_str(), registry.issues(issue_type));
    }

    let rate = if analyses == 0 {
        0.0
    } else {
        retakes as f64 / analyses as f64
    };
    let _ = writeln!(out, "retake_rate {:.3}", rate);
    out
}
