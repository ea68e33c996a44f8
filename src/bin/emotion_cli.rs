use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use speech_emotion::analysis::{EmotionLabel, FeatureExtractor, FeatureVectorAssembler};
use speech_emotion::audio::{AudioSignal, SignalLoader};
use speech_emotion::error::{ErrorCategory, ErrorCode, ServiceError};
use speech_emotion::http::{run_http_server, AppState};
use speech_emotion::service::FeatureAnalysis;
use speech_emotion::{AppConfig, EmotionService};
use tracing_subscriber::EnvFilter;

/// Exit code for unusable input (bad file, undecodable or too-short audio)
const EXIT_USER_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "emotion_cli",
    about = "Classify the emotional tone of speech recordings"
)]
struct Cli {
    /// JSON configuration file (defaults to config/emotion.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the classifier model artifact path
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one audio file and print the emotion as JSON
    Classify {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print every extracted feature and the assembled vector as JSON
    Features {
        #[arg(long)]
        file: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        /// Bind address, e.g. 0.0.0.0:8000
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Serialize)]
struct ClassifyPayload {
    emotion: EmotionLabel,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    match cli.command {
        Commands::Classify { file } => run_classify(&config, &file),
        Commands::Features { file } => run_features(&config, &file),
        Commands::Serve { addr } => run_serve(config, addr),
    }
}

fn run_classify(config: &AppConfig, file: &Path) -> Result<ExitCode> {
    let service = EmotionService::from_config(config).context("loading classifier model")?;
    let signal = match load_signal(service.loader(), file) {
        Ok(signal) => signal,
        Err(code) => return Ok(code),
    };

    let runtime = build_runtime()?;
    match runtime.block_on(service.classify_signal(Arc::new(signal))) {
        Ok(emotion) => {
            println!("{}", serde_json::to_string(&ClassifyPayload { emotion })?);
            Ok(ExitCode::from(0))
        }
        Err(err) => Ok(report_failure(&err)),
    }
}

fn run_features(config: &AppConfig, file: &Path) -> Result<ExitCode> {
    let loader = SignalLoader::new(config.analysis.min_duration_secs);
    let signal = match load_signal(&loader, file) {
        Ok(signal) => signal,
        Err(code) => return Ok(code),
    };

    let extractor = FeatureExtractor::new(config.analysis.clone());
    let assembler = FeatureVectorAssembler::new(config.assembler.undefined_policy);
    let analysis = FeatureAnalysis::compute(&extractor, &assembler, &signal);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(ExitCode::from(0))
}

fn run_serve(mut config: AppConfig, addr: Option<String>) -> Result<ExitCode> {
    if let Some(addr) = addr {
        config.server.bind_addr = addr;
    }
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_addr))?;

    let service = EmotionService::from_config(&config).context("loading classifier model")?;
    let state = AppState::new(Arc::new(service));

    build_runtime()?.block_on(run_http_server(state, addr, config.server.max_upload_bytes))?;
    Ok(ExitCode::from(0))
}

fn load_signal(loader: &SignalLoader, file: &Path) -> std::result::Result<AudioSignal, ExitCode> {
    loader
        .load_file(file)
        .map_err(|err| report_failure(&ServiceError::from(err)))
}

/// Print a categorized failure and pick the exit code
fn report_failure(err: &ServiceError) -> ExitCode {
    eprintln!(
        "{}",
        serde_json::json!({
            "error": err.message(),
            "code": err.code(),
            "category": err.category(),
        })
    );
    match err.category() {
        ErrorCategory::InvalidInput => ExitCode::from(EXIT_USER_ERROR),
        _ => ExitCode::from(1),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")
}
