/// Video/Audio to Notes Converter
///
/// HTTP service that turns an uploaded video or audio file into text notes:
/// normalize the audio with ffmpeg, transcribe it with Whisper, condense the
/// transcript with Gemini.

pub mod api;
pub mod audio;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod transcription;

// Re-export main types for easy access
pub use crate::audio::{FfmpegNormalizer, MediaKind, Normalizer};
pub use crate::config::Config;
pub use crate::llm::{GeminiSummarizer, Summarizer};
pub use crate::pipeline::{Pipeline, PipelineError, PipelineReport, PipelineStage};
pub use crate::transcription::{Transcriber, TranscriptionOutput, WhisperTranscriber};
