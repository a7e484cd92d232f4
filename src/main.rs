use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod audio;
mod config;
mod llm;
mod pipeline;
mod transcription;

use crate::audio::FfmpegNormalizer;
use crate::config::Config;
use crate::llm::GeminiSummarizer;
use crate::pipeline::Pipeline;
use crate::transcription::WhisperTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Video/Audio to Notes Converter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Converts uploaded video/audio files into transcripts and notes")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDR")
                .help("Bind address (overrides config)"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Bind port (overrides config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logging
    let default_filter = if matches.get_flag("verbose") {
        "media_notes=debug,tower_http=debug"
    } else {
        "media_notes=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()),
        )
        .init();

    // Load configuration
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }

    // Fail fast on a bad or credential-less configuration
    config.validate()?;

    info!("🚀 Video/Audio to Notes Converter starting...");
    info!("🔧 Whisper model: {}", config.transcription.model);
    info!("🔧 Summarization model: {}", config.summarization.model);
    info!("📁 Scratch directory: {}", config.scratch_dir().display());

    match WhisperTranscriber::check_availability().await {
        Ok(backend) => info!("🎤 {}", backend),
        Err(e) => warn!("No Whisper backend detected at startup: {}", e),
    }

    // Collaborators are built once and shared read-only across requests
    let normalizer = Arc::new(FfmpegNormalizer::new(config.audio.target_sample_rate));
    let transcriber = Arc::new(WhisperTranscriber::new(config.transcription.clone()));
    let summarizer = Arc::new(GeminiSummarizer::new(&config.summarization)?);

    let pipeline = Arc::new(Pipeline::new(
        normalizer,
        transcriber,
        summarizer,
        config.scratch_dir(),
    ));

    api::start_http_server(pipeline, &config.server.host, config.server.port).await
}
