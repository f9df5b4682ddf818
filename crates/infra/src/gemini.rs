//! HTTP client for a Gemini-style `generateContent` endpoint.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::debug;

use stockwatch_ai::{AiError, GenerateRequest, GenerateResponse, GenerativeClient};

use crate::config::PredictionConfig;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    url: String,
}

impl GeminiClient {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, AiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: generate_url(endpoint, model),
        })
    }

    pub fn from_config(config: &PredictionConfig) -> Result<Self, AiError> {
        Self::new(
            &config.endpoint,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!("{}/{}:generateContent", endpoint.trim_end_matches('/'), model.trim())
}

impl GenerativeClient for GeminiClient {
    fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<GenerateResponse, AiError> {
        // The key travels as a query parameter; keep the URL out of error text.
        let response = self
            .http
            .post(&self.url)
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .map_err(|e| AiError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(AiError::http(status.as_u16(), &body));
        }

        let body = response
            .text()
            .map_err(|e| AiError::Transport(e.without_url().to_string()))?;
        debug!(response_chars = body.len(), "generateContent answered");
        serde_json::from_str(&body).map_err(|e| AiError::InvalidResponse(e.to_string()))
    }
}
