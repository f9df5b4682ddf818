//! Outbound email seam.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// A plaintext email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Blocking email transport. Either delivers or returns an error; no retries.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

impl<M> Mailer for Arc<M>
where
    M: Mailer + ?Sized,
{
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        (**self).send(message)
    }
}

/// Minimal recipient sanity check shared by transports.
pub fn validate_recipient(address: &str) -> Result<(), MailError> {
    let trimmed = address.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(MailError::InvalidRecipient(address.to_string())),
    }
}

/// In-memory mailer for tests/dev: records every message it accepts.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail with a transport error.
    pub fn fail_for(self, address: impl Into<String>) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(address.into());
        }
        self
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        validate_recipient(&message.to)?;
        let rejected = self
            .failing
            .lock()
            .map(|f| f.contains(&message.to))
            .unwrap_or(false);
        if rejected {
            return Err(MailError::Transport(format!("simulated failure for {}", message.to)));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_needs_local_part_and_domain() {
        assert!(validate_recipient("vendor@example.com").is_ok());
        assert!(validate_recipient("vendor").is_err());
        assert!(validate_recipient("@example.com").is_err());
        assert!(validate_recipient("").is_err());
    }

    #[test]
    fn recording_mailer_keeps_accepted_messages_only() {
        let mailer = RecordingMailer::new().fail_for("down@example.com");

        mailer
            .send(&EmailMessage::new("ok@example.com", "hi", "body"))
            .unwrap();
        let err = mailer
            .send(&EmailMessage::new("down@example.com", "hi", "body"))
            .unwrap_err();

        assert!(matches!(err, MailError::Transport(_)));
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "ok@example.com");
    }
}
