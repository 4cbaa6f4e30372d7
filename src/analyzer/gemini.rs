//! Gemini API client
//!
//! Concrete [`AnalysisService`] implementation over Google's Generative
//! Language API.
//!
//! API Specifications:
//! - Default model: gemini-2.0-flash
//! - Endpoint: POST {base}/models/{model}:generateContent?key={api_key}
//! - Quota errors arrive as HTTP 429 and must be distinguishable so the
//!   rate limiter can enter its cooldown

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::service::{AnalysisService, AnalysisServiceError};
use crate::utils::env::{get_gemini_key, validate_api_key};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Request body for generateContent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Response from generateContent
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
    pub error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorDetail {
    pub code: Option<i32>,
    pub message: Option<String>,
    pub status: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    /// API key for authentication
    api_key: String,
    /// HTTP client (reused across requests)
    http_client: Client,
    /// API base URL
    api_base: String,
    /// Model identifier
    model: String,
}

impl GeminiClient {
    /// Create a client from the GEMINI_API_KEY environment variable
    ///
    /// # Errors
    /// Returns error if GEMINI_API_KEY is not set or malformed
    pub fn new() -> Result<Self> {
        let api_key = get_gemini_key()?;
        Self::with_key(api_key)
    }

    /// Create client with an explicit API key
    pub fn with_key(api_key: String) -> Result<Self> {
        Self::with_url(api_key, DEFAULT_API_BASE.to_string())
    }

    /// Create client with custom API base URL (for testing/staging)
    pub fn with_url(api_key: String, api_base: String) -> Result<Self> {
        validate_api_key(&api_key)?;

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            http_client,
            api_base,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    fn build_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: Some(4096),
            }),
        }
    }

    /// Classify a non-success HTTP status
    fn error_for_status(status: u16, body: String) -> AnalysisServiceError {
        match status {
            429 => AnalysisServiceError::QuotaExceeded,
            500 | 503 | 529 => AnalysisServiceError::Overloaded(status),
            _ => AnalysisServiceError::Http { status, body },
        }
    }

    /// Pull the first candidate's text out of a parsed response
    fn extract_text(response: GeminiResponse) -> Result<String, AnalysisServiceError> {
        if let Some(error) = response.error {
            let message = error.message.unwrap_or_default();
            return match error.code {
                Some(429) => Err(AnalysisServiceError::QuotaExceeded),
                Some(code) => Err(AnalysisServiceError::Http {
                    status: code as u16,
                    body: message,
                }),
                None => Err(AnalysisServiceError::Http {
                    status: 0,
                    body: message,
                }),
            };
        }

        let text = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(AnalysisServiceError::EmptyResponse)
        } else {
            Ok(text)
        }
    }

    /// Get the default model name (for validation/debugging)
    pub fn default_model() -> &'static str {
        DEFAULT_MODEL
    }

    /// Get the default API base (for validation/debugging)
    pub fn default_api_base() -> &'static str {
        DEFAULT_API_BASE
    }
}

#[async_trait]
impl AnalysisService for GeminiClient {
    async fn submit(&self, prompt: &str) -> Result<String, AnalysisServiceError> {
        let request = Self::build_request(prompt);

        let response = self
            .http_client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisServiceError::Timeout
                } else {
                    AnalysisServiceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisServiceError::Timeout
            } else {
                AnalysisServiceError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(Self::error_for_status(status.as_u16(), body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisServiceError::Http {
                status: status.as_u16(),
                body: format!("unparseable response body: {}", e),
            }
        })?;

        Self::extract_text(parsed)
    }
}
