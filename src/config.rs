use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the media-notes service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Audio normalization settings
    pub audio: AudioConfig,

    /// Transcription settings
    pub transcription: TranscriptionConfig,

    /// Summarization service settings
    pub summarization: SummarizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target sample rate for transcription
    pub target_sample_rate: u32,

    /// Scratch directory for per-request temp files (system temp dir if unset)
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model to use
    pub model: String,

    /// Path to a local ggml model file (whisper.cpp backends)
    pub model_path: Option<PathBuf>,

    /// Language hint for transcription (auto-detect if unset)
    pub language: Option<String>,

    /// Timeout for one transcription run (seconds)
    pub timeout: u64,

    /// Maximum concurrent model invocations
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Gemini API key; taken from GOOGLE_API_KEY when not set in the file
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
            scratch_dir: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            model_path: None,
            language: None,
            timeout: 600,
            max_concurrent: 1,
        }
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro-latest".to_string(),
            max_output_tokens: 4096,
            temperature: 0.1,
            timeout_seconds: 120,
        }
    }
}

impl Config {
    /// Load configuration: explicit file if given, otherwise the first
    /// parseable default location, otherwise built-in defaults. Environment
    /// overrides are applied last in every case.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
                toml::from_str(&content)
                    .map_err(|e| anyhow!("failed to parse config file {}: {}", path.display(), e))?
            }
            None => Self::load_default_locations(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn load_default_locations() -> Self {
        let config_paths = ["media-notes.toml", "config/media-notes.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::default()
    }

    /// Override file/default values from the process environment
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MEDIA_NOTES_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MEDIA_NOTES_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(sample_rate) = std::env::var("MEDIA_NOTES_SAMPLE_RATE") {
            if let Ok(sample_rate) = sample_rate.parse() {
                self.audio.target_sample_rate = sample_rate;
            }
        }
        if let Ok(model) = std::env::var("MEDIA_NOTES_WHISPER_MODEL") {
            self.transcription.model = model;
        }
        if let Ok(api_key) = std::env::var("GOOGLE_API_KEY") {
            self.summarization.api_key = Some(api_key);
        }
    }

    /// Validate configuration. Runs at startup so a missing summarization
    /// credential fails the process fast instead of failing per-request.
    pub fn validate(&self) -> Result<()> {
        if self.summarization.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(anyhow!(
                "summarization API key missing: set GOOGLE_API_KEY or summarization.api_key"
            ));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("target_sample_rate must be greater than 0"));
        }

        if self.transcription.timeout == 0 {
            return Err(anyhow!("transcription timeout must be greater than 0"));
        }

        if self.summarization.timeout_seconds == 0 {
            return Err(anyhow!("summarization timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Scratch directory for per-request temp files
    pub fn scratch_dir(&self) -> PathBuf {
        self.audio
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.audio.target_sample_rate, 16_000);
        assert_eq!(config.transcription.model, "base");
        assert_eq!(config.transcription.max_concurrent, 1);
        assert_eq!(config.summarization.model, "gemini-1.5-pro-latest");
        assert!(config.summarization.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [summarization]
            api_key = "abc123"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.transcription.model, "base");
        assert_eq!(config.summarization.api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_validation_requires_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_validation_rejects_empty_api_key() {
        let mut config = Config::default();
        config.summarization.api_key = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_passes_with_api_key() {
        let mut config = Config::default();
        config.summarization.api_key = Some("abc123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scratch_dir_defaults_to_system_temp() {
        let config = Config::default();
        assert_eq!(config.scratch_dir(), std::env::temp_dir());

        let mut config = Config::default();
        config.audio.scratch_dir = Some(PathBuf::from("/var/scratch"));
        assert_eq!(config.scratch_dir(), PathBuf::from("/var/scratch"));
    }
}
