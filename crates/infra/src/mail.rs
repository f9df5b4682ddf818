//! Outbound mail transports.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info};

use stockwatch_core::mail::validate_recipient;
use stockwatch_core::{EmailMessage, MailError, Mailer, SecretSource};

use crate::config::{ConfigError, MailConfig, MailTransport};

/// Request body accepted by the relay.
#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts each message as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpRelayMailer {
    client: Client,
    url: String,
    token: Option<String>,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(url: impl Into<String>, from: impl Into<String>, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            token: None,
            from: from.into(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl Mailer for HttpRelayMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        validate_recipient(&message.to)?;

        let mut request = self.client.post(&self.url).json(&RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| MailError::Transport(e.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!(to = %message.to, subject = %message.subject, "mail relayed");
        Ok(())
    }
}

/// One line of the outbox file.
#[derive(Debug, Serialize)]
struct OutboxEntry<'a> {
    queued_at: DateTime<Utc>,
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Appends each message as a JSON line to a local file, for hosts without a
/// relay (a separate process can drain it).
#[derive(Debug)]
pub struct OutboxMailer {
    path: PathBuf,
    from: String,
    lock: Mutex<()>,
}

impl OutboxMailer {
    pub fn new(path: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: from.into(),
            lock: Mutex::new(()),
        }
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        validate_recipient(&message.to)?;

        let mut line = serde_json::to_string(&OutboxEntry {
            queued_at: Utc::now(),
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            body: &message.body,
        })
        .map_err(|e| MailError::Transport(e.to_string()))?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MailError::Transport(e.to_string()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| MailError::Transport(format!("open {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .map_err(|e| MailError::Transport(format!("write {}: {e}", self.path.display())))?;

        debug!(to = %message.to, subject = %message.subject, "mail queued in outbox");
        Ok(())
    }
}

/// Build the transport selected by `[mail]`.
pub fn build_mailer<K>(config: &MailConfig, secrets: &K) -> Result<Box<dyn Mailer>, ConfigError>
where
    K: SecretSource + ?Sized,
{
    match config.transport {
        MailTransport::Outbox => {
            info!(path = %config.outbox_path.display(), "mail transport: outbox");
            Ok(Box::new(OutboxMailer::new(&config.outbox_path, &config.from)))
        }
        MailTransport::Relay => {
            let url = config
                .relay_url
                .as_deref()
                .ok_or_else(|| ConfigError::Invalid("mail.relay_url is not set".to_string()))?;
            let mut mailer = HttpRelayMailer::new(url, &config.from, Duration::from_secs(config.timeout_secs))
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if let Some(token) = secrets.get(&config.relay_token_env) {
                mailer = mailer.with_token(token);
            }
            info!(url, "mail transport: relay");
            Ok(Box::new(mailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::StaticSecrets;

    #[test]
    fn outbox_appends_one_json_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail").join("outbox.jsonl");
        let mailer = OutboxMailer::new(&path, "stock@shop.test");

        mailer
            .send(&EmailMessage::new("orders@vendor.test", "Reorder Request: Widget", "Please send 10"))
            .unwrap();
        mailer
            .send(&EmailMessage::new("owner@shop.test", "Low Stock Alert: Widget", "Only 4 left"))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["to"], "orders@vendor.test");
        assert_eq!(lines[0]["from"], "stock@shop.test");
        assert_eq!(lines[1]["subject"], "Low Stock Alert: Widget");
        assert!(lines[1]["queued_at"].is_string());
    }

    #[test]
    fn outbox_rejects_bad_recipients_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let mailer = OutboxMailer::new(&path, "stock@shop.test");

        let err = mailer.send(&EmailMessage::new("nobody", "s", "b")).unwrap_err();
        assert_eq!(err, MailError::InvalidRecipient("nobody".to_string()));
        assert!(!path.exists());
    }

    #[test]
    fn relay_without_url_is_a_config_error() {
        let config = MailConfig {
            transport: MailTransport::Relay,
            ..MailConfig::default()
        };
        assert!(build_mailer(&config, &StaticSecrets::new()).is_err());
    }

    #[test]
    fn relay_rejects_bad_recipients_before_any_request() {
        let mailer = HttpRelayMailer::new("http://127.0.0.1:9/send", "stock@shop.test", Duration::from_millis(50))
            .unwrap()
            .with_token("t");
        let err = mailer.send(&EmailMessage::new("", "s", "b")).unwrap_err();
        assert!(matches!(err, MailError::InvalidRecipient(_)));
    }
}
