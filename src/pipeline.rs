use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::audio::{MediaKind, NormalizeError, Normalizer};
use crate::llm::{SummarizeError, Summarizer};
use crate::transcription::{TranscribeError, Transcriber, TranscriptionOutput};

/// Errors surfaced by a pipeline run, one variant per failure class
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("unsupported file format: {filename}")]
    UnsupportedFormat { filename: String },

    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] NormalizeError),

    #[error(transparent)]
    Transcription(#[from] TranscribeError),

    #[error(transparent)]
    Summarization(#[from] SummarizeError),
}

impl PipelineError {
    /// One-line message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat { .. } => {
                "Unsupported file format. Please upload a video or audio file."
            }
            PipelineError::Io(_) => "Internal error while handling the upload. Please try again.",
            PipelineError::Decode(_) => {
                "Could not decode the uploaded file. Please upload a valid video or audio file."
            }
            PipelineError::Transcription(_) => "Transcription failed for the uploaded file.",
            PipelineError::Summarization(SummarizeError::OversizedInput) => {
                "The transcript is too long for the summarization service to process in one request."
            }
            PipelineError::Summarization(_) => "Could not generate notes from the transcript.",
        }
    }
}

/// Stages a request moves through, in order. A failure at any stage is
/// terminal for the request.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Normalizing,
    Transcribing,
    Summarizing,
    Complete,
}

/// Result of a successful pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Full transcription text
    pub transcript: String,
    /// Condensed notes
    pub notes: String,
    /// Detected language, if the transcriber reports one
    pub language: Option<String>,
    /// Total wall-clock time
    pub processing_time: Duration,
    /// Stages completed, ending in `Complete`
    pub stages_completed: Vec<PipelineStage>,
}

/// Orchestrates normalize -> transcribe -> summarize for one upload at a time.
///
/// Owns exactly two temporary files per request: the staged input copy and the
/// normalized WAV. Both are released exactly once on every exit path; if the
/// request future is dropped mid-stage the `NamedTempFile` guards remove them
/// on drop.
pub struct Pipeline {
    normalizer: Arc<dyn Normalizer>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
    scratch_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            normalizer,
            transcriber,
            summarizer,
            scratch_dir,
        }
    }

    /// Process one uploaded media file into a transcript and notes
    pub async fn process(&self, filename: &str, bytes: &[u8]) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        info!("📥 Received upload: {} ({} bytes)", filename, bytes.len());

        // Classify before any temp file exists; rejected uploads create nothing
        let kind = MediaKind::from_path(Path::new(filename)).ok_or_else(|| {
            PipelineError::UnsupportedFormat {
                filename: filename.to_string(),
            }
        })?;

        let input_file = self.stage_upload(filename, bytes).await?;
        let audio_file = self.reserve_wav()?;

        let outcome = self
            .run_stages(kind, input_file.path(), audio_file.path())
            .await;

        // Exactly-once release on every exit path. A deletion failure is a
        // cleanup error: logged, never propagated, never masking the outcome.
        release(input_file);
        release(audio_file);

        let (transcription, notes, stages_completed) = outcome?;
        let processing_time = started.elapsed();

        info!(
            "🎉 Pipeline completed in {:.1}s ({} transcript chars, {} note chars)",
            processing_time.as_secs_f64(),
            transcription.text.len(),
            notes.len()
        );

        Ok(PipelineReport {
            transcript: transcription.text,
            notes,
            language: transcription.language,
            processing_time,
            stages_completed,
        })
    }

    /// Copy the upload into the scratch directory, preserving the extension
    /// so downstream tools can sniff the container
    async fn stage_upload(&self, filename: &str, bytes: &[u8]) -> Result<NamedTempFile, PipelineError> {
        let suffix = Path::new(filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?;

        tokio::fs::write(file.path(), bytes).await?;
        Ok(file)
    }

    /// Reserve a uniquely-named output path for the normalized audio
    fn reserve_wav(&self) -> Result<NamedTempFile, PipelineError> {
        let file = tempfile::Builder::new()
            .prefix("normalized-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)?;
        Ok(file)
    }

    /// The three collaborator calls, strictly in order. Temp-file ownership
    /// stays with the caller.
    async fn run_stages(
        &self,
        kind: MediaKind,
        input_path: &Path,
        audio_path: &Path,
    ) -> Result<(TranscriptionOutput, String, Vec<PipelineStage>), PipelineError> {
        let mut stages = vec![PipelineStage::Received, PipelineStage::Normalizing];

        match kind {
            MediaKind::Video => info!("🎬 Extracting audio from video..."),
            MediaKind::Audio => info!("🎵 Converting audio to WAV format..."),
        }
        self.normalizer.normalize(input_path, audio_path).await?;

        stages.push(PipelineStage::Transcribing);
        info!("🎙️  Transcribing audio...");
        let transcription = self.transcriber.transcribe(audio_path).await?;

        stages.push(PipelineStage::Summarizing);
        info!("📝 Generating notes from transcription...");
        let notes = self.summarizer.summarize(&transcription.text).await?;

        stages.push(PipelineStage::Complete);
        Ok((transcription, notes, stages))
    }
}

/// Delete a pipeline-owned temp file, logging (only) on failure
fn release(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!("🧹 Failed to remove temp file {}: {}", path.display(), e);
    }
}
