//! Capture Quality CLI
//!
//! Command-line interface for screening image files and demonstrating the
//! live assessment loop against a mock camera.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture_quality::{
    capture::{
        Camera, CameraError, ConfigError, FileConfig, FrameThrottle, MockCamera, MockScene,
        ThresholdPreset,
    },
    metrics::{MetricsError, MetricsRegistry},
    scoring::blur_grade,
    AnalysisOptions, CaptureMode, FrameSource, QualityResult, QualityThresholds, SourceError,
    Validator,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

/// Screen captured photographs for blur, exposure, framing and resolution.
#[derive(Debug, Parser)]
#[command(name = "capture-quality", author, version, about)]
struct Cli {
    /// TOML configuration file ([capture], [engine], [thresholds]).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one or more image files.
    Analyze {
        /// Image files (PNG, JPEG, ...).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Capture mode: tongue, face, body or general.
        #[arg(short, long)]
        mode: Option<CaptureMode>,

        /// Sample five fixed regions for the sharpness pass.
        #[arg(long)]
        regional: bool,

        /// Include per-metric detail.
        #[arg(long)]
        detailed: bool,

        /// Record analysis duration and timestamp.
        #[arg(long)]
        timing: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Assess a mock camera preview at a throttled cadence.
    Watch {
        /// Capture mode: tongue, face, body or general.
        #[arg(short, long)]
        mode: Option<CaptureMode>,

        /// Frames to capture (0 = until Ctrl+C).
        #[arg(long, default_value_t = 60)]
        frames: u32,

        /// Assess every N-th frame (defaults to the engine setting).
        #[arg(long)]
        every: Option<u32>,

        /// Synthetic scene rendered by the mock camera.
        #[arg(long, value_enum, default_value_t = SceneArg::Subject)]
        scene: SceneArg,

        /// Make every N-th mock capture fail (0 = never).
        #[arg(long, default_value_t = 0)]
        dropouts: u64,

        /// Serve Prometheus metrics on this port (requires the `metrics` feature).
        #[arg(long)]
        metrics_port: Option<u16>,
    },

    /// Print the effective thresholds as TOML.
    Thresholds {
        /// Start from a named preset instead of the configured one.
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Toml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SceneArg {
    Subject,
    Flat,
    Dark,
}

impl From<SceneArg> for MockScene {
    fn from(scene: SceneArg) -> Self {
        match scene {
            SceneArg::Subject => MockScene::CenteredSubject,
            SceneArg::Flat => MockScene::Flat,
            SceneArg::Dark => MockScene::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Default,
    Strict,
    Lenient,
}

impl From<PresetArg> for ThresholdPreset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => ThresholdPreset::Default,
            PresetArg::Strict => ThresholdPreset::Strict,
            PresetArg::Lenient => ThresholdPreset::Lenient,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {}", .path.display(), .source)]
    Source { path: PathBuf, source: SourceError },
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("frame assessment failed: {0}")]
    Assess(#[from] SourceError),
    #[error("failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    result: &'a QualityResult,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Command::Analyze {
            files,
            mode,
            regional,
            detailed,
            timing,
            format,
        } => {
            let mut options = file_config.engine.analysis_options();
            if let Some(mode) = mode {
                options.mode = mode;
            }
            options.regional_sampling |= regional;
            options.detailed = detailed;
            options.include_timing = timing;
            analyze(&file_config, &files, &options, format)
        }
        Command::Watch {
            mode,
            frames,
            every,
            scene,
            dropouts,
            metrics_port,
        } => {
            let mode = mode.unwrap_or(file_config.engine.mode);
            let every = every.unwrap_or(file_config.engine.assess_every);
            let camera = MockCamera::with_scene(scene.into()).with_dropouts(dropouts);
            watch(&file_config, camera, mode, frames, every, metrics_port)
        }
        Command::Thresholds { preset } => {
            let thresholds = match preset {
                Some(preset) => {
                    let t = ThresholdPreset::from(preset)
                        .thresholds()
                        .merged(&file_config.thresholds);
                    t.validate().map_err(ConfigError::from)?;
                    t
                }
                None => file_config.quality_thresholds()?,
            };
            print!("{}", toml::to_string_pretty(&thresholds)?);
            Ok(())
        }
    }
}

fn analyze(
    file_config: &FileConfig,
    files: &[PathBuf],
    options: &AnalysisOptions,
    format: OutputFormat,
) -> Result<(), CliError> {
    let validator = Validator::with_config(
        file_config.engine.validator_config(),
        file_config.quality_thresholds()?,
    );
    info!(
        "Capture Quality v{}: analyzing {} file(s) in {} mode",
        capture_quality::VERSION,
        files.len(),
        options.mode
    );

    for path in files {
        let bytes = std::fs::read(path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        let result = validator
            .analyze_image(FrameSource::Encoded(&bytes), options)
            .map_err(|source| CliError::Source {
                path: path.clone(),
                source,
            })?;

        match format {
            OutputFormat::Text => print_text(path, &result, &validator.thresholds()),
            OutputFormat::Toml => {
                let report = FileReport {
                    file: path.display().to_string(),
                    result: &result,
                };
                println!("{}", toml::to_string_pretty(&report)?);
            }
        }
    }

    validator.dispose();
    Ok(())
}

fn print_text(path: &Path, result: &QualityResult, thresholds: &QualityThresholds) {
    println!(
        "{}: {} ({:.1}/100)",
        path.display(),
        result.category(),
        result.score()
    );
    if let Some(meta) = result.metadata() {
        println!(
            "  {}x{} analysed at {}x{}",
            meta.source_width, meta.source_height, meta.analyzed_width, meta.analyzed_height
        );
        if let Some(ms) = meta.duration_ms {
            println!("  took {:.1} ms", ms);
        }
    }
    if let Some(metrics) = result.metrics() {
        let [blur, lighting, composition, resolution] = metrics.scores();
        println!(
            "  blur {:.2} ({})  lighting {:.2}  composition {:.2}  resolution {:.2} ({})",
            blur,
            blur_grade(blur, &thresholds.blur),
            lighting,
            composition,
            resolution,
            metrics.resolution.adequacy
        );
        for zone in &metrics.lighting.zones {
            println!(
                "  zone {:<12} lighting {:.2} brightness {:.0}",
                zone.name, zone.score, zone.brightness
            );
        }
    }
    for issue in result.issues() {
        println!(
            "  [{}] {}: {} (confidence {:.2})",
            issue.severity, issue.issue_type, issue.message, issue.confidence
        );
    }
    for suggestion in result.suggestions() {
        println!("  -> {}", suggestion);
    }
}

fn watch(
    file_config: &FileConfig,
    mut camera: impl Camera,
    mode: CaptureMode,
    frames: u32,
    every: u32,
    metrics_port: Option<u16>,
) -> Result<(), CliError> {
    let registry = Arc::new(MetricsRegistry::new()?);
    let validator = Validator::with_config(
        file_config.engine.validator_config(),
        file_config.quality_thresholds()?,
    )
    .with_metrics(Arc::clone(&registry));

    if let Some(port) = metrics_port {
        serve_metrics(port, Arc::clone(&registry));
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let capture = &file_config.capture;
    camera.open(capture)?;
    let frame_interval = Duration::from_secs_f64(1.0 / capture.fps as f64);
    let mut throttle = FrameThrottle::new(every);

    info!(
        mode = %mode,
        every = throttle.every(),
        "Watching mock camera preview (Ctrl+C to stop)"
    );

    let mut captured = 0u32;
    while running.load(Ordering::SeqCst) && (frames == 0 || captured < frames) {
        captured += 1;
        let frame = match camera.capture() {
            Ok(f) => f,
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                continue;
            }
        };

        if throttle.should_assess(&frame) {
            let result = validator.assess_frame(&frame, mode)?;
            let hint = result.suggestions().first().map(String::as_str).unwrap_or("");
            if result.needs_retake() {
                warn!(
                    frame = frame.sequence(),
                    age_ms = frame.age().as_millis() as u64,
                    score = result.score(),
                    category = %result.category(),
                    "{}",
                    hint
                );
            } else {
                info!(
                    frame = frame.sequence(),
                    age_ms = frame.age().as_millis() as u64,
                    score = result.score(),
                    category = %result.category(),
                    "{}",
                    hint
                );
            }
        }

        std::thread::sleep(frame_interval);
    }

    camera.close();
    info!(
        "Captured {} frames, assessed {} ({} analyses recorded, {} failures)",
        throttle.offered(),
        throttle.selected(),
        registry.analyses(),
        registry.failures()
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn serve_metrics(port: u16, registry: Arc<MetricsRegistry>) {
    use capture_quality::metrics::{MetricsServer, MetricsServerConfig};

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(port: u16, _registry: Arc<MetricsRegistry>) {
    warn!(
        port,
        "Built without the `metrics` feature, metrics will not be served"
    );
}
