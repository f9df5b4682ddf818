//! Inventory procedures over the workbook.
//!
//! Everything here is written against the `TableStore`/`Mailer`/`Clock` seams
//! from `stockwatch-core`; no adapter is chosen in this crate.

pub mod alerts;
pub mod records;
pub mod reset;
pub mod usage;

pub use alerts::{AlertCheckReport, AlertDecision, AlertRecipients, check_inventory_levels};
pub use records::{InventoryRow, ReorderHistoryEntry, Stock, StockFlag, UsageRow, UsageStatus};
pub use reset::reset_alert_flag;
pub use usage::{InventorySnapshot, ReconcileReport, UsageAction, apply_usage_log};
