use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{TranscribeError, Transcriber, TranscriptionOutput};
use crate::config::TranscriptionConfig;

/// Whisper CLI transcriber.
///
/// Shells out to whichever Whisper implementation is installed, preferring the
/// whisper.cpp binaries over the Python package. The underlying model is loaded
/// by the subprocess per invocation; a semaphore caps how many invocations run
/// at once (one by default) so concurrent requests queue instead of loading the
/// model several times over.
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
    permits: Arc<Semaphore>,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self { config, permits }
    }

    /// Check whether any Whisper backend is installed
    pub async fn check_availability() -> Result<String, TranscribeError> {
        let backends = [
            ("whisper-cli", "whisper.cpp (Homebrew)"),
            ("whisper-cpp", "whisper.cpp"),
            ("whisper", "OpenAI Whisper (Python)"),
        ];

        for (cmd_name, description) in &backends {
            if Self::check_command_available(cmd_name).await {
                return Ok(format!("{} available", description));
            }
        }

        Err(TranscribeError::BackendUnavailable(
            "install whisper.cpp or openai-whisper".to_string(),
        ))
    }

    /// Run the best available backend against `audio_path`, writing JSON
    /// output into `output_dir`
    async fn run_whisper_command(
        &self,
        audio_path: &Path,
        output_dir: &Path,
    ) -> Result<WhisperOutput, TranscribeError> {
        let backends = [("whisper-cli", true), ("whisper-cpp", true), ("whisper", false)];

        for (cmd_name, is_cpp) in &backends {
            if Self::check_command_available(cmd_name).await {
                debug!("Using {} backend for transcription", cmd_name);
                return if *is_cpp {
                    self.run_whisper_cpp_command(cmd_name, audio_path, output_dir).await
                } else {
                    self.run_python_whisper_command(audio_path, output_dir).await
                };
            }
        }

        Err(TranscribeError::BackendUnavailable(
            "install whisper.cpp or openai-whisper".to_string(),
        ))
    }

    /// whisper.cpp invocation (whisper-cli / whisper-cpp)
    async fn run_whisper_cpp_command(
        &self,
        cmd_name: &str,
        audio_path: &Path,
        output_dir: &Path,
    ) -> Result<WhisperOutput, TranscribeError> {
        let base_name = audio_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let output_file = output_dir.join(&base_name);

        let mut cmd = Command::new(cmd_name);
        cmd.arg("-f")
            .arg(audio_path)
            .arg("-oj") // JSON output
            .arg("-of")
            .arg(&output_file)
            .arg("-tp")
            .arg("0.0"); // Deterministic temperature

        if let Some(model_path) = &self.config.model_path {
            cmd.arg("-m").arg(model_path);
        }
        if let Some(language) = &self.config.language {
            cmd.arg("-l").arg(language);
        }

        self.execute_and_parse(cmd, output_dir, cmd_name).await
    }

    /// Python OpenAI Whisper invocation (fallback)
    async fn run_python_whisper_command(
        &self,
        audio_path: &Path,
        output_dir: &Path,
    ) -> Result<WhisperOutput, TranscribeError> {
        let mut cmd = Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False")
            .arg("--fp16")
            .arg("False")
            .arg("--temperature")
            .arg("0.0");

        if let Some(language) = &self.config.language {
            cmd.arg("--language").arg(language);
        }

        self.execute_and_parse(cmd, output_dir, "whisper").await
    }

    /// Execute the prepared command under the configured timeout and parse the
    /// JSON file it leaves in `output_dir`
    async fn execute_and_parse(
        &self,
        mut cmd: Command,
        output_dir: &Path,
        backend_name: &str,
    ) -> Result<WhisperOutput, TranscribeError> {
        cmd.kill_on_drop(true);
        debug!("Executing command: {:?}", cmd);

        let timeout = Duration::from_secs(self.config.timeout);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "⏰ {} timed out after {} seconds",
                    backend_name, self.config.timeout
                );
                return Err(TranscribeError::Timeout(self.config.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("unknown error")
                .trim()
                .to_string();
            return Err(TranscribeError::Whisper(format!(
                "{} exited with {}: {}",
                backend_name, output.status, reason
            )));
        }

        let json_files = Self::find_json_outputs(output_dir).await?;
        let json_path = json_files.first().ok_or_else(|| {
            TranscribeError::Parse(format!("no {} JSON output found", backend_name))
        })?;

        let json_content = tokio::fs::read_to_string(json_path).await?;
        serde_json::from_str::<WhisperOutput>(&json_content)
            .map_err(|e| TranscribeError::Parse(format!("{} JSON output: {}", backend_name, e)))
    }

    /// Check if a command is available
    async fn check_command_available(cmd_name: &str) -> bool {
        Command::new(cmd_name)
            .arg("--help")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn find_json_outputs(dir: &Path) -> Result<Vec<PathBuf>, TranscribeError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionOutput, TranscribeError> {
        // Queue behind in-flight invocations; the semaphore is never closed
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| TranscribeError::Whisper(e.to_string()))?;

        let start_time = Instant::now();
        info!("🎤 Starting transcription: {}", audio_path.display());

        // Scratch directory for the backend's JSON output, removed on drop
        let scratch = tempfile::tempdir()?;
        let whisper_output = self.run_whisper_command(audio_path, scratch.path()).await?;
        let (text, language) = collect_text(whisper_output)?;

        let processing_time = start_time.elapsed();
        info!(
            "🎉 Transcription completed in {:.1}s: {} characters",
            processing_time.as_secs_f64(),
            text.len()
        );

        Ok(TranscriptionOutput {
            text,
            language,
            processing_time,
        })
    }
}

/// Assemble the full transcript from whichever JSON layout the backend emitted
fn collect_text(output: WhisperOutput) -> Result<(String, Option<String>), TranscribeError> {
    if !output.transcription.is_empty() {
        // whisper.cpp format: transcription array with string timestamps
        let text = output
            .transcription
            .iter()
            .map(|seg| seg.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return Ok((text, output.language));
    }

    if !output.segments.is_empty() {
        // Python whisper format: segments array
        let text = output.text.unwrap_or_else(|| {
            output
                .segments
                .iter()
                .map(|seg| seg.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });
        return Ok((text.trim().to_string(), output.language));
    }

    match output.text {
        Some(text) => Ok((text.trim().to_string(), output.language)),
        None => Err(TranscribeError::Parse(
            "output contained no transcription segments".to_string(),
        )),
    }
}

/// Whisper JSON output, covering both the whisper.cpp and Python layouts
#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperTranscriptionSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperTranscriptionSegment {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TranscriptionConfig {
        TranscriptionConfig {
            model: "base".to_string(),
            model_path: None,
            language: None,
            timeout: 300,
            max_concurrent: 1,
        }
    }

    #[test]
    fn test_transcriber_creation() {
        let transcriber = WhisperTranscriber::new(test_config());
        assert_eq!(transcriber.permits.available_permits(), 1);
    }

    #[test]
    fn test_zero_max_concurrent_still_gets_a_permit() {
        let mut config = test_config();
        config.max_concurrent = 0;
        let transcriber = WhisperTranscriber::new(config);
        assert_eq!(transcriber.permits.available_permits(), 1);
    }

    #[test]
    fn test_collect_text_cpp_format() {
        let json = r#"{
            "transcription": [
                {"text": " hello", "timestamps": {"from": "00:00:00,000", "to": "00:00:01,000"}},
                {"text": " world", "timestamps": {"from": "00:00:01,000", "to": "00:00:02,000"}}
            ]
        }"#;
        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let (text, language) = collect_text(output).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(language, None);
    }

    #[test]
    fn test_collect_text_python_format() {
        let json = r#"{
            "text": " hello world ",
            "language": "en",
            "segments": [{"text": " hello"}, {"text": " world"}]
        }"#;
        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let (text, language) = collect_text(output).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(language, Some("en".to_string()));
    }

    #[test]
    fn test_collect_text_empty_output_is_an_error() {
        let output: WhisperOutput = serde_json::from_str("{}").unwrap();
        assert!(collect_text(output).is_err());
    }

    #[test]
    fn test_whisper_availability_probe() {
        tokio_test::block_on(async {
            // Passes regardless of whether a backend is installed
            let _result = WhisperTranscriber::check_availability().await;
        });
    }
}
