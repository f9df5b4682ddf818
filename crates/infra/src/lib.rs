//! `stockwatch-infra`
//!
//! Concrete adapters behind the `stockwatch-core` seams, plus configuration,
//! provisioning and the trigger scheduler.

pub mod config;
pub mod gemini;
pub mod mail;
pub mod provision;
pub mod scheduler;
pub mod triggers;
pub mod workbook;

pub use config::{Config, ConfigError, MailTransport};
pub use gemini::GeminiClient;
pub use mail::{HttpRelayMailer, OutboxMailer, build_mailer};
pub use provision::{SetupError, SetupReport, setup};
pub use scheduler::{Dispatch, Due, Scheduler, SchedulerHandle, next_due};
pub use triggers::FileTriggerRegistry;
pub use workbook::CsvWorkbook;
