//! Prediction rows and the inference error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_core::Row;
use stockwatch_core::cell::{format_timestamp, parse_number};

/// Item name written by the sentinel row of a failed run.
pub const ERROR_ITEM: &str = "ERROR";
pub const NOT_AVAILABLE: &str = "N/A";

/// Longest response body excerpt kept in an error message.
const BODY_EXCERPT_CHARS: usize = 200;

/// Stockout likelihood reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Confidence {
    /// Numeric score (expected in \[0, 1\]; not enforced).
    Score(f64),
    /// Non-numeric text, kept verbatim (e.g. `N/A`).
    Text(String),
    Missing,
}

impl Confidence {
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        use serde_json::Value;
        match value {
            None | Some(Value::Null) => Confidence::Missing,
            Some(Value::Number(n)) => n.as_f64().map(Confidence::Score).unwrap_or(Confidence::Missing),
            Some(Value::String(s)) if s.trim().is_empty() => Confidence::Missing,
            Some(Value::String(s)) => parse_number(s)
                .map(Confidence::Score)
                .unwrap_or_else(|| Confidence::Text(s.clone())),
            Some(other) => Confidence::Text(other.to_string()),
        }
    }

    pub fn to_cell(&self) -> String {
        match self {
            Confidence::Score(score) => score.to_string(),
            Confidence::Text(text) => text.clone(),
            Confidence::Missing => String::new(),
        }
    }
}

/// One row of the AI Predictions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub generated_at: DateTime<Utc>,
    pub item: String,
    pub confidence: Confidence,
    pub notes: String,
}

impl PredictionEntry {
    /// Sentinel row standing in for all results of a failed run.
    pub fn error(generated_at: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            generated_at,
            item: ERROR_ITEM.to_string(),
            confidence: Confidence::Text(NOT_AVAILABLE.to_string()),
            notes: reason.into(),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            format_timestamp(self.generated_at),
            self.item.clone(),
            self.confidence.to_cell(),
            self.notes.clone(),
        ]
    }
}

/// Prediction run failure. The `Display` text is what lands in the sentinel row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AiError {
    #[error("Missing {0} credential")]
    MissingCredential(String),

    #[error("API error: HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to parse AI response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// Non-success HTTP status; the body is cut to a short excerpt.
    pub fn http(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        let mut excerpt: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        if trimmed.chars().count() > BODY_EXCERPT_CHARS {
            excerpt.push('…');
        }
        Self::Http {
            status,
            body: excerpt,
        }
    }
}
