//! `stockwatch-ai`
//!
//! **Responsibility:** stockout prediction via an external generative-text
//! endpoint.
//!
//! - The HTTP transport is behind [`GenerativeClient`]; the concrete client
//!   lives in `stockwatch-infra`.
//! - Predictions are insights written to their own table; they never mutate
//!   inventory state.

pub mod client;
pub mod extract;
pub mod job;
pub mod prompt;
pub mod result;
pub mod stockout;

pub use client::{GenerateRequest, GenerateResponse, GenerativeClient};
pub use extract::{extract_json_array, parse_predictions};
pub use job::AiJob;
pub use prompt::{PredictionInput, build_prompt};
pub use result::{AiError, Confidence, PredictionEntry};
pub use stockout::{PredictionOutcome, PredictionSettings, StockoutPredictionJob, run_ai_prediction};
