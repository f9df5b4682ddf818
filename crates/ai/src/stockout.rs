//! Stockout prediction: one request to the generative endpoint per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stockwatch_core::{Clock, SecretSource, StoreResult, Table, TableStore};

use crate::client::{GenerateRequest, GenerativeClient};
use crate::extract::parse_predictions;
use crate::job::AiJob;
use crate::prompt::{PredictionInput, build_prompt};
use crate::result::{AiError, PredictionEntry};

/// Job asking the model which items are at risk of a stockout.
pub struct StockoutPredictionJob<'a, G: GenerativeClient + ?Sized> {
    input: PredictionInput,
    client: &'a G,
    api_key: String,
    generated_at: DateTime<Utc>,
}

impl<'a, G: GenerativeClient + ?Sized> StockoutPredictionJob<'a, G> {
    pub fn new(input: PredictionInput, client: &'a G, api_key: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            input,
            client,
            api_key: api_key.into(),
            generated_at,
        }
    }
}

impl<G: GenerativeClient + ?Sized> AiJob for StockoutPredictionJob<'_, G> {
    type Input = PredictionInput;
    type Output = Vec<PredictionEntry>;

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn run(&self) -> Result<Self::Output, AiError> {
        let prompt = build_prompt(self.input());
        debug!(prompt_chars = prompt.len(), "requesting stockout predictions");

        let response = self
            .client
            .generate(&self.api_key, &GenerateRequest::from_prompt(prompt))?;
        parse_predictions(response.first_text()?, self.generated_at)
    }
}

/// Where the prediction run finds its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionSettings {
    /// Secret name holding the API key.
    pub api_key_secret: String,
    /// Human-facing credential name used in the sentinel row.
    pub credential_label: String,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            api_key_secret: "GEMINI_API_KEY".to_string(),
            credential_label: "Gemini API key".to_string(),
        }
    }
}

/// Result of one prediction run. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    /// Number of prediction rows written.
    Written(usize),
    /// A sentinel row with this reason was written instead.
    Failed(String),
}

/// Replace the AI Predictions table with a fresh set of predictions.
///
/// The table is cleared and its header rewritten first. Any failure of the
/// external call (missing credential, non-success status, unparsable body)
/// writes a single `ERROR` sentinel row and ends the run; there is no retry.
/// Only workbook failures are returned as `Err`.
pub fn run_ai_prediction<S, G, K, C>(
    store: &S,
    client: &G,
    secrets: &K,
    clock: &C,
    settings: &PredictionSettings,
) -> StoreResult<PredictionOutcome>
where
    S: TableStore + ?Sized,
    G: GenerativeClient + ?Sized,
    K: SecretSource + ?Sized,
    C: Clock + ?Sized,
{
    store.reset_table(Table::AiPredictions)?;
    let generated_at = clock.now();

    let Some(api_key) = secrets.get(&settings.api_key_secret) else {
        let err = AiError::MissingCredential(settings.credential_label.clone());
        return write_sentinel(store, generated_at, &err);
    };

    let input = PredictionInput::from_tables(
        &store.read_rows(Table::InventoryMaster)?,
        &store.read_rows(Table::UsageLog)?,
    );
    let job = StockoutPredictionJob::new(input, client, api_key, generated_at);
    debug!(
        inventory_rows = job.input().inventory.len(),
        usage_rows = job.input().usage.len(),
        "prediction input assembled"
    );

    match job.run() {
        Ok(predictions) => {
            for prediction in &predictions {
                store.append_row(Table::AiPredictions, prediction.to_row())?;
            }
            info!(predictions = predictions.len(), "stockout predictions written");
            Ok(PredictionOutcome::Written(predictions.len()))
        }
        Err(err) => write_sentinel(store, generated_at, &err),
    }
}

fn write_sentinel<S>(store: &S, generated_at: DateTime<Utc>, err: &AiError) -> StoreResult<PredictionOutcome>
where
    S: TableStore + ?Sized,
{
    let reason = err.to_string();
    warn!(error = %reason, "stockout prediction failed");
    store.append_row(Table::AiPredictions, PredictionEntry::error(generated_at, reason.clone()).to_row())?;
    Ok(PredictionOutcome::Failed(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use stockwatch_core::{FixedClock, InMemoryTableStore, Row, StaticSecrets};

    use crate::client::GenerateResponse;

    /// Scripted endpoint: returns a fixed result and records the prompts it saw.
    struct FakeClient {
        reply: Result<String, AiError>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl FakeClient {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: AiError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl GenerativeClient for FakeClient {
        fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<GenerateResponse, AiError> {
            let prompt = request.contents[0].parts[0].text.clone().unwrap_or_default();
            self.prompts.lock().unwrap().push((api_key.to_string(), prompt));
            let text = self.reply.clone()?;
            Ok(GenerateResponse {
                candidates: vec![crate::client::Candidate {
                    content: Some(crate::client::Content {
                        parts: vec![crate::client::Part { text: Some(text) }],
                    }),
                }],
            })
        }
    }

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap())
    }

    fn store() -> InMemoryTableStore {
        InMemoryTableStore::provisioned()
            .with_rows(Table::InventoryMaster, vec![row(&["X", "2", "5", "TRUE", ""])])
            .with_rows(Table::UsageLog, vec![row(&["2024-06-30T10:00:00Z", "X", "3", "", "APPLIED"])])
            .with_rows(Table::AiPredictions, vec![row(&["old", "stale", "0.1", "previous run"])])
    }

    fn secrets() -> StaticSecrets {
        StaticSecrets::new().with("GEMINI_API_KEY", "test-key")
    }

    #[test]
    fn job_prompts_with_its_own_input_snapshot() {
        let input = PredictionInput::from_tables(&[row(&["X", "2", "5", "TRUE", ""])], &[]);
        let client = FakeClient::answering(r#"[{"item":"X","confidence":0.7,"notes":"n"}]"#);
        let job = StockoutPredictionJob::new(input.clone(), &client, "k", clock().0);

        assert_eq!(job.input(), &input);
        let predictions = job.run().unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(client.calls(), vec![("k".to_string(), build_prompt(&input))]);
    }

    #[test]
    fn missing_credential_writes_only_the_sentinel_row() {
        let store = store();
        let client = FakeClient::answering("[]");

        let outcome = run_ai_prediction(
            &store,
            &client,
            &StaticSecrets::new(),
            &clock(),
            &PredictionSettings::default(),
        )
        .unwrap();

        assert_eq!(
            outcome,
            PredictionOutcome::Failed("Missing Gemini API key credential".to_string())
        );
        assert_eq!(
            store.read_rows(Table::AiPredictions).unwrap(),
            vec![row(&["2024-07-01T09:00:00Z", "ERROR", "N/A", "Missing Gemini API key credential"])]
        );
        assert!(client.calls().is_empty());
    }

    #[test]
    fn predictions_replace_previous_run() {
        let store = store();
        let client = FakeClient::answering(
            r#"Here you go: [{"item":"X","confidence":0.9,"notes":"low stock"}]"#,
        );

        let outcome =
            run_ai_prediction(&store, &client, &secrets(), &clock(), &PredictionSettings::default()).unwrap();

        assert_eq!(outcome, PredictionOutcome::Written(1));
        assert_eq!(
            store.read_rows(Table::AiPredictions).unwrap(),
            vec![row(&["2024-07-01T09:00:00Z", "X", "0.9", "low stock"])]
        );

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "test-key");
        assert!(calls[0].1.contains("\"Item\": \"X\""));
        assert!(calls[0].1.contains("\"Status\": \"APPLIED\""));
    }

    #[test]
    fn http_failure_becomes_a_sentinel_row() {
        let store = store();
        let client = FakeClient::failing(AiError::http(500, "backend unavailable"));

        let outcome =
            run_ai_prediction(&store, &client, &secrets(), &clock(), &PredictionSettings::default()).unwrap();

        assert_eq!(
            outcome,
            PredictionOutcome::Failed("API error: HTTP 500: backend unavailable".to_string())
        );
        let rows = store.read_rows(Table::AiPredictions).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "ERROR");
        assert_eq!(rows[0][2], "N/A");
    }

    #[test]
    fn unparsable_answer_becomes_a_sentinel_row() {
        let store = store();
        let client = FakeClient::answering("Nothing looks risky this month.");

        let outcome =
            run_ai_prediction(&store, &client, &secrets(), &clock(), &PredictionSettings::default()).unwrap();

        match outcome {
            PredictionOutcome::Failed(reason) => assert!(reason.starts_with("Failed to parse AI response")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.read_rows(Table::AiPredictions).unwrap().len(), 1);
    }

    #[test]
    fn empty_prediction_list_leaves_only_the_header() {
        let store = store();
        let client = FakeClient::answering("[]");

        let outcome =
            run_ai_prediction(&store, &client, &secrets(), &clock(), &PredictionSettings::default()).unwrap();

        assert_eq!(outcome, PredictionOutcome::Written(0));
        assert!(store.read_rows(Table::AiPredictions).unwrap().is_empty());
    }
}
