//! Runtime configuration loaded from a TOML file.
//!
//! Every section has defaults, so an absent file (or an absent section) is
//! valid. Relative paths are resolved against the directory holding the
//! config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_core::{Handler, Schedule, Trigger, TriggerError};
use stockwatch_inventory::AlertRecipients;
use stockwatch_observability::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one CSV file per table.
    pub workbook_dir: PathBuf,
    pub alerts: AlertsConfig,
    pub mail: MailConfig,
    pub prediction: PredictionConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook_dir: PathBuf::from("workbook"),
            alerts: AlertsConfig::default(),
            mail: MailConfig::default(),
            prediction: PredictionConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertsConfig {
    pub vendor_email: String,
    pub owner_email: String,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransport {
    /// POST each message to an HTTP relay.
    Relay,
    /// Append each message to a local JSON-lines file.
    #[default]
    Outbox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub relay_url: Option<String>,
    /// Environment variable holding the relay bearer token, if any.
    pub relay_token_env: String,
    pub from: String,
    pub outbox_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::Outbox,
            relay_url: None,
            relay_token_env: "STOCKWATCH_MAIL_TOKEN".to_string(),
            from: "stockwatch@localhost".to_string(),
            outbox_path: PathBuf::from("outbox.jsonl"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionConfig {
    /// Base URL of the models collection; `/{model}:generateContent` is appended.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub daily_check_hour: u32,
    pub monthly_prediction_day: u32,
    pub monthly_prediction_hour: u32,
    pub triggers_path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_check_hour: 8,
            monthly_prediction_day: 1,
            monthly_prediction_hour: 9,
            triggers_path: PathBuf::from("triggers.toml"),
        }
    }
}

impl ScheduleConfig {
    /// The two recurring triggers `setup` provisions.
    pub fn default_triggers(&self) -> Result<Vec<Trigger>, TriggerError> {
        Ok(vec![
            Trigger::new(Handler::CheckInventoryLevels, Schedule::daily(self.daily_check_hour)?),
            Trigger::new(
                Handler::RunAiPrediction,
                Schedule::monthly(self.monthly_prediction_day, self.monthly_prediction_hour)?,
            ),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl Config {
    /// Load and validate `path`. A missing file yields the defaults; callers
    /// decide whether to warn about it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Config>(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Config::default()
        };

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.workbook_dir,
            &mut self.mail.outbox_path,
            &mut self.schedule.triggers_path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule
            .default_triggers()
            .map_err(|e| ConfigError::Invalid(format!("schedule: {e}")))?;

        if self.mail.transport == MailTransport::Relay
            && self.mail.relay_url.as_deref().is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "mail.relay_url is required when mail.transport = \"relay\"".to_string(),
            ));
        }
        if self.prediction.model.trim().is_empty() {
            return Err(ConfigError::Invalid("prediction.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Alert recipients; only the inventory check needs them.
    pub fn recipients(&self) -> Result<AlertRecipients, ConfigError> {
        let vendor = self.alerts.vendor_email.trim();
        let owner = self.alerts.owner_email.trim();
        if vendor.is_empty() || owner.is_empty() {
            return Err(ConfigError::Invalid(
                "alerts.vendor_email and alerts.owner_email must both be set".to_string(),
            ));
        }
        Ok(AlertRecipients {
            vendor: vendor.to_string(),
            owner: owner.to_string(),
        })
    }
}
