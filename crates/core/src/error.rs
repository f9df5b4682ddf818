//! Error model for the workbook seams.

use thiserror::Error;

use crate::table::Table;

/// Result type used by every [`TableStore`](crate::store::TableStore) operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Tabular store failure.
///
/// Keep this focused on the workbook itself (missing tables, bad coordinates,
/// I/O). Bad *data* inside a table is never an error: procedures record it in
/// the row's flag/status column instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The table has not been provisioned yet (run `setup`).
    #[error("table not found: {0}")]
    TableNotFound(Table),

    /// `create_table` was called for a table that is already present.
    #[error("table already exists: {0}")]
    TableExists(Table),

    /// A data row index past the end of the table.
    #[error("row {row} out of range for {table}")]
    RowOutOfRange { table: Table, row: usize },

    /// A 1-based column outside the table's header width.
    #[error("column {column} out of range for {table}")]
    InvalidColumn { table: Table, column: usize },

    /// The persisted representation could not be decoded.
    #[error("malformed table {table}: {detail}")]
    Malformed { table: Table, detail: String },

    /// Underlying storage failure (filesystem, permissions, ...).
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn malformed(table: Table, detail: impl Into<String>) -> Self {
        Self::Malformed {
            table,
            detail: detail.into(),
        }
    }
}

/// Outbound email failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("mail relay rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Trigger registry failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("trigger storage error: {0}")]
    Storage(String),
}
