//! Command-line front-end over the estimation pipeline.
//!
//! Commands return `Result<_, String>`; the binary maps `Err` to a non-zero
//! exit code. Output is JSON on stdout so it can be piped.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::config::{self, AnalyzerConfig};
use crate::pipeline::estimate::{
    assess_photo_quality, AnalysisState, FaceAnalyzer, FaceHashes, FaceImages, FileImage,
    ImageSource, QualityReport,
};

#[derive(Parser, Debug)]
#[command(
    name = "skinsight",
    version,
    about = "Educational skin estimate from three face photos"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a front, left and right photo
    Analyze {
        #[arg(long, value_name = "PATH")]
        front: PathBuf,

        #[arg(long, value_name = "PATH")]
        left: PathBuf,

        #[arg(long, value_name = "PATH")]
        right: PathBuf,

        /// Remote scoring endpoint (overrides config)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Skip remote scoring
        #[arg(long)]
        offline: bool,

        /// Intake answers as a JSON object
        #[arg(long, value_name = "JSON")]
        meta: Option<String>,

        /// Config file (defaults to the user config dir)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Report photo quality issues
    Quality {
        #[arg(required = true, value_name = "PATH")]
        files: Vec<PathBuf>,
    },

    /// Print per-photo hashes and the combined seed
    Seed {
        front: PathBuf,
        left: PathBuf,
        right: PathBuf,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<AnalyzerConfig, String> {
    let config = match path.or_else(config::default_config_path) {
        Some(path) => AnalyzerConfig::load(&path).map_err(|e| e.to_string())?,
        None => AnalyzerConfig::default(),
    };
    config.with_env_overrides().map_err(|e| e.to_string())
}

fn parse_meta(raw: Option<&str>) -> Result<Value, String> {
    match raw {
        None => Ok(Value::Null),
        Some(text) => {
            let meta: Value =
                serde_json::from_str(text).map_err(|e| format!("Invalid --meta JSON: {e}"))?;
            if !meta.is_object() {
                return Err("--meta must be a JSON object".into());
            }
            Ok(meta)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn file(path: PathBuf) -> Arc<dyn ImageSource> {
    Arc::new(FileImage::new(path))
}

async fn analyze(
    front: PathBuf,
    left: PathBuf,
    right: PathBuf,
    endpoint: Option<String>,
    offline: bool,
    meta: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), String> {
    let mut config = load_config(config_path)?;
    if endpoint.is_some() {
        config.remote_endpoint = endpoint;
    }
    config.offline |= offline;
    config.validate().map_err(|e| e.to_string())?;

    let meta = parse_meta(meta.as_deref())?;
    let analyzer = FaceAnalyzer::from_config(config).map_err(|e| e.to_string())?;
    if let Some(request) = analyzer.set_meta(meta) {
        analyzer.execute(request).await;
    }

    let images = FaceImages::complete(file(front), file(left), file(right));
    match analyzer.analyze(images).await {
        AnalysisState::Done { result } => print_json(result.as_ref()),
        AnalysisState::Error { failure, .. } => Err(failure.user_message().to_string()),
        other => Err(format!("Analysis did not finish ({:?})", other.status())),
    }
}

#[derive(Serialize)]
struct QualityEntry {
    file: String,
    #[serde(flatten)]
    report: QualityReport,
    hints: Vec<&'static str>,
}

async fn quality(files: Vec<PathBuf>) -> Result<(), String> {
    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("Could not read {}: {e}", path.display()))?;
        let report = assess_photo_quality(&bytes);
        entries.push(QualityEntry {
            file: path.display().to_string(),
            hints: report.hints(),
            report,
        });
    }
    print_json(&entries)
}

#[derive(Serialize)]
struct SeedOutput {
    front: u32,
    left: u32,
    right: u32,
    seed: u32,
}

async fn seed(front: PathBuf, left: PathBuf, right: PathBuf) -> Result<(), String> {
    let read = |path: PathBuf| async move {
        tokio::fs::read(&path)
            .await
            .map_err(|e| format!("Could not read {}: {e}", path.display()))
    };
    let (f, l, r) = tokio::try_join!(read(front), read(left), read(right))?;
    let hashes = FaceHashes::from_bytes(&f, &l, &r);
    print_json(&SeedOutput {
        front: hashes.front,
        left: hashes.left,
        right: hashes.right,
        seed: hashes.seed(),
    })
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Analyze {
            front,
            left,
            right,
            endpoint,
            offline,
            meta,
            config,
        } => analyze(front, left, right, endpoint, offline, meta, config).await,
        Command::Quality { files } => quality(files).await,
        Command::Seed { front, left, right } => seed(front, left, right).await,
    }
}
