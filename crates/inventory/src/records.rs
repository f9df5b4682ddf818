//! Named-field records over the positional tables.
//!
//! This is the only module that knows which column holds what. Procedures
//! work with these records and write back through the column constants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwatch_core::cell::{format_number, format_timestamp, parse_bool, parse_number};
use stockwatch_core::Row;

/// 1-based columns of the Inventory Master table.
pub mod inventory_col {
    pub const ITEM: usize = 1;
    pub const QUANTITY: usize = 2;
    pub const THRESHOLD: usize = 3;
    pub const ALERT_SENT: usize = 4;
    pub const FLAG: usize = 5;
}

/// 1-based columns of the Usage Log table.
pub mod usage_col {
    pub const TIMESTAMP: usize = 1;
    pub const ITEM: usize = 2;
    pub const QUANTITY_USED: usize = 3;
    pub const NOTES: usize = 4;
    pub const STATUS: usize = 5;
}

pub const FLAG_INVALID_NUMBER: &str = "Invalid qty/threshold";
pub const FLAG_NEGATIVE_QUANTITY: &str = "Negative quantity!";
pub const HISTORY_STATUS_ALERT_SENT: &str = "Alert Sent";

fn cell(cells: &Row, column: usize) -> &str {
    cells.get(column - 1).map(String::as_str).unwrap_or("")
}

/// Why an inventory row was excluded from alerting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockFlag {
    /// Quantity or threshold is not a number.
    InvalidNumber,
    NegativeQuantity,
    NegativeThreshold,
}

impl StockFlag {
    /// Text written into the Flag column.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockFlag::InvalidNumber | StockFlag::NegativeThreshold => FLAG_INVALID_NUMBER,
            StockFlag::NegativeQuantity => FLAG_NEGATIVE_QUANTITY,
        }
    }
}

/// Validated stock figures of one item.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub quantity: f64,
    pub threshold: f64,
}

impl Stock {
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.threshold
    }
}

/// One row of Inventory Master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    /// 0-based data row position in the table.
    pub position: usize,
    pub item: String,
    pub quantity: Option<f64>,
    pub threshold: Option<f64>,
    pub alert_sent: bool,
    pub flag: String,
}

impl InventoryRow {
    pub fn from_cells(position: usize, cells: &Row) -> Self {
        Self {
            position,
            item: cell(cells, inventory_col::ITEM).trim().to_string(),
            quantity: parse_number(cell(cells, inventory_col::QUANTITY)),
            threshold: parse_number(cell(cells, inventory_col::THRESHOLD)),
            alert_sent: parse_bool(cell(cells, inventory_col::ALERT_SENT)),
            flag: cell(cells, inventory_col::FLAG).to_string(),
        }
    }

    /// Both numbers present and non-negative, or the flag to record.
    pub fn stock(&self) -> Result<Stock, StockFlag> {
        let (Some(quantity), Some(threshold)) = (self.quantity, self.threshold) else {
            return Err(StockFlag::InvalidNumber);
        };
        if quantity < 0.0 {
            return Err(StockFlag::NegativeQuantity);
        }
        if threshold < 0.0 {
            return Err(StockFlag::NegativeThreshold);
        }
        Ok(Stock { quantity, threshold })
    }
}

pub fn read_inventory(rows: &[Row]) -> Vec<InventoryRow> {
    rows.iter()
        .enumerate()
        .map(|(position, cells)| InventoryRow::from_cells(position, cells))
        .collect()
}

/// Lifecycle of a usage row. Only `APPLIED` is skipped by reconciliation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageStatus {
    /// Blank status cell (or text we do not recognise).
    Pending,
    Applied,
    UnknownItem,
    InvalidQty,
}

impl UsageStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "APPLIED" => UsageStatus::Applied,
            "UNKNOWN_ITEM" => UsageStatus::UnknownItem,
            "INVALID_QTY" => UsageStatus::InvalidQty,
            _ => UsageStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Pending => "",
            UsageStatus::Applied => "APPLIED",
            UsageStatus::UnknownItem => "UNKNOWN_ITEM",
            UsageStatus::InvalidQty => "INVALID_QTY",
        }
    }
}

/// One row of the Usage Log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRow {
    pub position: usize,
    pub timestamp: String,
    pub item: String,
    /// Raw text of the Quantity Used cell.
    pub quantity_used: String,
    pub notes: String,
    pub status: UsageStatus,
}

impl UsageRow {
    pub fn from_cells(position: usize, cells: &Row) -> Self {
        Self {
            position,
            timestamp: cell(cells, usage_col::TIMESTAMP).to_string(),
            item: cell(cells, usage_col::ITEM).trim().to_string(),
            quantity_used: cell(cells, usage_col::QUANTITY_USED).to_string(),
            notes: cell(cells, usage_col::NOTES).to_string(),
            status: UsageStatus::parse(cell(cells, usage_col::STATUS)),
        }
    }

    /// Valid non-negative quantity used.
    pub fn used(&self) -> Option<f64> {
        parse_number(&self.quantity_used).filter(|n| *n >= 0.0)
    }
}

pub fn read_usage(rows: &[Row]) -> Vec<UsageRow> {
    rows.iter()
        .enumerate()
        .map(|(position, cells)| UsageRow::from_cells(position, cells))
        .collect()
}

/// Audit record appended once per alert firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub item: String,
    pub quantity: f64,
    pub threshold: f64,
}

impl ReorderHistoryEntry {
    pub fn to_row(&self) -> Row {
        vec![
            format_timestamp(self.timestamp),
            self.item.clone(),
            format_number(self.quantity),
            format_number(self.threshold),
            HISTORY_STATUS_ALERT_SENT.to_string(),
        ]
    }
}
