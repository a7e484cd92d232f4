pub mod whisper;

pub use whisper::WhisperTranscriber;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Errors from speech-to-text transcription
#[derive(thiserror::Error, Debug)]
pub enum TranscribeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no Whisper backend found: {0}")]
    BackendUnavailable(String),

    #[error("transcription failed: {0}")]
    Whisper(String),

    #[error("transcription timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to parse Whisper output: {0}")]
    Parse(String),
}

/// Transcript produced from a normalized audio file
#[derive(Debug, Clone)]
pub struct TranscriptionOutput {
    /// Full transcription text, best-effort, returned as-is
    pub text: String,
    /// Detected language, if the backend reports one
    pub language: Option<String>,
    /// Wall-clock transcription time
    pub processing_time: Duration,
}

/// Capability interface for speech-to-text.
///
/// Implementations are constructed once at process start and shared read-only
/// across requests; they must be safe to call from concurrent handler tasks.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionOutput, TranscribeError>;
}
