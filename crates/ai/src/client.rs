//! Generative-text endpoint seam and its JSON wire format.
//!
//! Request:  `{"contents":[{"parts":[{"text": "<prompt>"}]}]}`
//! Response: `{"candidates":[{"content":{"parts":[{"text": "<answer>"}]}}]}`

use serde::{Deserialize, Serialize};

use crate::result::AiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// Single-turn request carrying one text part.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.into()),
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Result<&str, AiError> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .ok_or_else(|| AiError::InvalidResponse("response has no candidate text".to_string()))
    }
}

/// Blocking call to a generative-text endpoint.
///
/// Implementations map a non-success status to [`AiError::Http`] and a
/// transport failure to [`AiError::Transport`]. No retries.
pub trait GenerativeClient: Send + Sync {
    fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<GenerateResponse, AiError>;
}

impl<G> GenerativeClient for std::sync::Arc<G>
where
    G: GenerativeClient + ?Sized,
{
    fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<GenerateResponse, AiError> {
        (**self).generate(api_key, request)
    }
}
