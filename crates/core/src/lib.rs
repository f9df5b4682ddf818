//! `stockwatch-core`: shared building blocks.
//!
//! This crate holds the seams every procedure is written against (tabular
//! store, mailer, clock, secrets, trigger registry) plus in-memory doubles.
//! Concrete adapters live in `stockwatch-infra`.

pub mod cell;
pub mod clock;
pub mod error;
pub mod mail;
pub mod secrets;
pub mod store;
pub mod table;
pub mod trigger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{MailError, StoreError, StoreResult, TriggerError};
pub use mail::{EmailMessage, Mailer, RecordingMailer};
pub use secrets::{EnvSecrets, SecretSource, StaticSecrets};
pub use store::{InMemoryTableStore, TableStore};
pub use table::{Row, Table};
pub use trigger::{Handler, InMemoryTriggerRegistry, Schedule, ScheduleKind, Trigger, TriggerRegistry};
