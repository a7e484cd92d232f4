pub mod gemini;

pub use gemini::GeminiSummarizer;

use async_trait::async_trait;

/// Instruction prepended to every summarization request; the transcript is
/// embedded verbatim after it
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following text into concise notes:";

/// Errors from the remote summarization service
#[derive(thiserror::Error, Debug)]
pub enum SummarizeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("summarization request failed: {0}")]
    Request(String),

    #[error("summarization service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transcript exceeds the summarization service input limit")]
    OversizedInput,

    #[error("summarization service returned an empty response")]
    EmptyResponse,

    #[error("failed to parse summarization response: {0}")]
    Parse(String),
}

/// Capability interface for condensing a transcript into notes
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}
