use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors from audio normalization
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio decoding failed: {0}")]
    Decode(String),
}

/// Kind of media accepted by the pipeline, classified by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Video container extensions accepted for audio extraction
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Audio extensions accepted for conversion to WAV
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "wav", "mp3"];

impl MediaKind {
    /// Classify an extension against the allowlist, case-insensitively.
    /// Returns `None` for anything outside the allowlist; no decoding is
    /// attempted for rejected extensions.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Capability interface for producing transcription-ready audio
#[async_trait]
pub trait Normalizer: Send + Sync {
    /// Decode `input_path` and write a canonical WAV file to `output_path`.
    /// Writes exactly one file; never deletes the input.
    async fn normalize(&self, input_path: &Path, output_path: &Path) -> Result<(), NormalizeError>;
}

/// FFmpeg-backed normalizer producing mono PCM WAV at the target sample rate
#[derive(Debug, Clone)]
pub struct FfmpegNormalizer {
    /// Output sample rate (16kHz optimal for Whisper)
    target_sample_rate: u32,
}

impl FfmpegNormalizer {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }
}

impl Default for FfmpegNormalizer {
    fn default() -> Self {
        Self::new(16_000)
    }
}

#[async_trait]
impl Normalizer for FfmpegNormalizer {
    async fn normalize(&self, input_path: &Path, output_path: &Path) -> Result<(), NormalizeError> {
        info!("🎵 Normalizing audio: {}", input_path.display());

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(input_path)
            .arg("-vn") // No video stream
            .arg("-acodec")
            .arg("pcm_s16le") // 16-bit PCM
            .arg("-ar")
            .arg(self.target_sample_rate.to_string())
            .arg("-ac")
            .arg("1") // Mono channel
            .arg("-f")
            .arg("wav")
            .arg("-y") // Overwrite existing
            .arg(output_path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // ffmpeg prints its banner first; the failure reason is at the end
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("unknown ffmpeg error")
                .trim()
                .to_string();
            debug!("ffmpeg stderr: {}", stderr);
            return Err(NormalizeError::Decode(reason));
        }

        info!(
            "✅ Audio normalized: {} ({}Hz mono WAV)",
            output_path.display(),
            self.target_sample_rate
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_video_extensions_classified() {
        for ext in ["mp4", "mov", "avi"] {
            assert_eq!(MediaKind::from_extension(ext), Some(MediaKind::Video));
        }
    }

    #[test]
    fn test_audio_extensions_classified() {
        for ext in ["m4a", "wav", "mp3"] {
            assert_eq!(MediaKind::from_extension(ext), Some(MediaKind::Audio));
        }
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("Mp3"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("WAV"), Some(MediaKind::Audio));
    }

    #[test]
    fn test_unsupported_extensions_rejected() {
        for ext in ["txt", "pdf", "mkv", "flac", "webm", ""] {
            assert_eq!(MediaKind::from_extension(ext), None);
        }
    }

    #[test]
    fn test_classification_from_path() {
        assert_eq!(
            MediaKind::from_path(&PathBuf::from("/tmp/meeting.mp4")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(&PathBuf::from("lecture.M4A")),
            Some(MediaKind::Audio)
        );
        assert_eq!(MediaKind::from_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(MediaKind::from_path(&PathBuf::from("no_extension")), None);
    }
}
