use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{SummarizeError, Summarizer, SUMMARY_INSTRUCTION};
use crate::config::SummarizationConfig;

/// Gemini API base URL
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Summarizer backed by the Gemini generateContent API.
///
/// Sends the transcript in a single request; oversized transcripts fail with
/// `SummarizeError::OversizedInput` rather than being chunked. No retry.
pub struct GeminiSummarizer {
    api_key: String,
    model: String,
    max_output_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(config: &SummarizationConfig) -> Result<Self, SummarizeError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SummarizeError::Configuration("Gemini API key required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SummarizeError::Request(e.to_string()))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            client,
        })
    }

    /// Build the API URL
    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            API_BASE_URL, self.model, self.api_key
        )
    }

    /// Build the request body embedding the transcript verbatim
    fn build_request(&self, transcript: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: format!("{}\n\n{}", SUMMARY_INSTRUCTION, transcript),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        }
    }

    /// Extract the notes text from the response
    fn extract_text(response: &GeminiResponse) -> Option<String> {
        response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

/// Whether an error body is the input-size overflow case, which gets its own
/// user-facing message
fn is_oversized_input(status: reqwest::StatusCode, body: &str) -> bool {
    let lower = body.to_lowercase();
    status == reqwest::StatusCode::BAD_REQUEST && lower.contains("token") && lower.contains("exceed")
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        debug!(
            "Sending summarization request to Gemini ({} chars)",
            transcript.len()
        );

        let request = self.build_request(transcript);
        let response = self
            .client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_oversized_input(status, &body) {
                return Err(SummarizeError::OversizedInput);
            }
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Parse(e.to_string()))?;

        Self::extract_text(&gemini_response).ok_or(SummarizeError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SummarizationConfig {
        SummarizationConfig {
            api_key: Some("test-key".to_string()),
            model: "gemini-1.5-pro-latest".to_string(),
            max_output_tokens: 4096,
            temperature: 0.1,
            timeout_seconds: 120,
        }
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let mut config = test_config();
        config.api_key = None;
        assert!(matches!(
            GeminiSummarizer::new(&config),
            Err(SummarizeError::Configuration(_))
        ));
    }

    #[test]
    fn test_api_url_contains_model_and_key() {
        let summarizer = GeminiSummarizer::new(&test_config()).unwrap();
        let url = summarizer.api_url();

        assert!(url.contains("gemini-1.5-pro-latest"));
        assert!(url.contains("test-key"));
        assert!(url.contains("generateContent"));
    }

    #[test]
    fn test_request_embeds_transcript_verbatim() {
        let summarizer = GeminiSummarizer::new(&test_config()).unwrap();
        let request = summarizer.build_request("hello world");

        assert_eq!(request.contents.len(), 1);
        let text = &request.contents[0].parts[0].text;
        assert!(text.starts_with(SUMMARY_INSTRUCTION));
        assert!(text.ends_with("\n\nhello world"));
    }

    #[test]
    fn test_oversized_input_classification() {
        let body = r#"{"error": {"message": "The input token count (2000000) exceeds the maximum number of tokens allowed (1048576)."}}"#;
        assert!(is_oversized_input(reqwest::StatusCode::BAD_REQUEST, body));

        // Other 400s are plain API errors
        assert!(!is_oversized_input(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "Invalid JSON payload"}}"#
        ));
        // Quota errors arrive as 429, not the oversize case
        assert!(!is_oversized_input(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "token quota exceeded"
        ));
    }

    #[test]
    fn test_extract_text_from_response() {
        let response = GeminiResponse {
            candidates: vec![GeminiCandidate {
                content: GeminiContent {
                    parts: vec![GeminiPart {
                        text: " Note: hello world ".to_string(),
                    }],
                },
            }],
        };

        assert_eq!(
            GeminiSummarizer::extract_text(&response),
            Some("Note: hello world".to_string())
        );
    }

    #[test]
    fn test_extract_text_empty_response() {
        let response = GeminiResponse { candidates: vec![] };
        assert_eq!(GeminiSummarizer::extract_text(&response), None);
    }
}
