//! Client for the hosted generative-text API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::AiError;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const TEMPERATURE: f32 = 0.9;
const TOP_K: u32 = 20;
const TOP_P: f32 = 0.9;
const MAX_OUTPUT_TOKENS: u32 = 1024;

const BLOCKED_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` makes every call fail with a configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Configuration(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::Configuration("GEMINI_API_KEY is not set".to_string()))?;

        debug!("Calling {} ({} prompt chars)", self.config.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(|e| {
                error!("Generative API request failed: {}", e);
                AiError::Upstream(format!("request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::Upstream(format!("reading response failed: {}", e)))?;

        if !status.is_success() {
            error!("Generative API returned {}: {}", status, body);
            return Err(classify_error(status.as_u16(), &body));
        }

        extract_text(&body)
    }
}

// -- Wire types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: BLOCKED_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: BLOCK_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text(body: &str) -> Result<String, AiError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AiError::Upstream(format!("unexpected response body: {}", e)))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        // Blocked prompts come back with no candidate text.
        return Err(AiError::Upstream("model returned no text".to_string()));
    }
    Ok(text)
}

fn classify_error(status: u16, body: &str) -> AiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if message.contains("API key") || status == 401 || status == 403 {
        AiError::Configuration(message)
    } else {
        AiError::Upstream(format!("HTTP {}: {}", status, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_sampling_and_safety_settings() {
        let body = serde_json::to_value(GenerateRequest::new("hello")).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        let cfg = &body["generationConfig"];
        assert_eq!(cfg["topK"], 20);
        assert_eq!(cfg["maxOutputTokens"], 1024);
        assert!((cfg["temperature"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!((cfg["topP"].as_f64().unwrap() - 0.9).abs() < 1e-6);

        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[test]
    fn extracts_and_joins_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn empty_candidates_is_upstream_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(extract_text(body), Err(AiError::Upstream(_))));
    }

    #[test]
    fn api_key_errors_are_configuration_errors() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(classify_error(400, body), AiError::Configuration(_)));
        assert!(matches!(classify_error(503, "overloaded"), AiError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, AiError::Configuration(_)));
        assert_eq!(err.public_message(), "AI service configuration error");
    }

    #[test]
    fn endpoint_uses_model_and_trims_base() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://localhost:9999/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
