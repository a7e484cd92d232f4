//! Request handlers

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::{error, warn};

use super::models::{ApiResponse, HealthData, ProcessData};
use super::server::AppState;
use crate::llm::SummarizeError;
use crate::pipeline::PipelineError;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(ApiResponse::success(HealthData {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
    }))
}

/// Process an uploaded media file into a transcript and notes.
/// Expects a single multipart file field carrying the original filename.
pub async fn process_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => {
            warn!("Process request with no file field");
            return error_response(StatusCode::BAD_REQUEST, "No file uploaded.".to_string());
        }
        Err(e) => {
            warn!("Failed to read multipart body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "Could not read the uploaded file.".to_string(),
            );
        }
    };

    let filename = match field.file_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            warn!("Upload without a filename");
            return error_response(
                StatusCode::BAD_REQUEST,
                "The uploaded file has no filename.".to_string(),
            );
        }
    };

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read upload bytes for {}: {}", filename, e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "Could not read the uploaded file.".to_string(),
            );
        }
    };

    match state.pipeline.process(&filename, &bytes).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ApiResponse::success(ProcessData {
                transcript: report.transcript,
                notes: report.notes,
                language: report.language,
                processing_time_seconds: report.processing_time.as_secs_f64(),
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Pipeline failed for {}: {}", filename, e);
            error_response(error_status(&e), e.user_message().to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(ApiResponse::<ProcessData>::error(message))).into_response()
}

/// HTTP status for each pipeline failure class
fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Transcription(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Summarization(SummarizeError::OversizedInput) => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::Summarization(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NormalizeError;
    use crate::transcription::TranscribeError;

    #[test]
    fn test_error_status_mapping() {
        let unsupported = PipelineError::UnsupportedFormat {
            filename: "notes.txt".to_string(),
        };
        assert_eq!(error_status(&unsupported), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let decode = PipelineError::Decode(NormalizeError::Decode("bad".to_string()));
        assert_eq!(error_status(&decode), StatusCode::UNPROCESSABLE_ENTITY);

        let transcription =
            PipelineError::Transcription(TranscribeError::Whisper("bad".to_string()));
        assert_eq!(error_status(&transcription), StatusCode::INTERNAL_SERVER_ERROR);

        let oversized = PipelineError::Summarization(SummarizeError::OversizedInput);
        assert_eq!(error_status(&oversized), StatusCode::PAYLOAD_TOO_LARGE);

        let api_down = PipelineError::Summarization(SummarizeError::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(error_status(&api_down), StatusCode::BAD_GATEWAY);
    }
}
