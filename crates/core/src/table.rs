//! The four named tables of the workbook and their header rows.

use serde::{Deserialize, Serialize};

/// One positional row of text cells.
pub type Row = Vec<String>;

/// A named table in the workbook.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Authoritative stock levels.
    InventoryMaster,
    /// Append-only consumption events.
    UsageLog,
    /// Alert audit trail (written only).
    ReorderHistory,
    /// Latest prediction run (fully replaced each run).
    AiPredictions,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::InventoryMaster,
        Table::UsageLog,
        Table::ReorderHistory,
        Table::AiPredictions,
    ];

    /// Human-facing table name (sheet title).
    pub fn name(&self) -> &'static str {
        match self {
            Table::InventoryMaster => "Inventory Master",
            Table::UsageLog => "Usage Log",
            Table::ReorderHistory => "Reorder History",
            Table::AiPredictions => "AI Predictions",
        }
    }

    /// Filesystem-friendly identifier.
    pub fn slug(&self) -> &'static str {
        match self {
            Table::InventoryMaster => "inventory_master",
            Table::UsageLog => "usage_log",
            Table::ReorderHistory => "reorder_history",
            Table::AiPredictions => "ai_predictions",
        }
    }

    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Table::InventoryMaster => &["Item", "Quantity", "Threshold", "Alert Sent", "Flag"],
            Table::UsageLog => &["Timestamp", "Item", "Quantity Used", "Notes", "Status"],
            Table::ReorderHistory => &["Timestamp", "Item", "Quantity", "Threshold", "Status"],
            Table::AiPredictions => &["Generated At", "Item", "Confidence", "Notes"],
        }
    }

    pub fn width(&self) -> usize {
        self.header().len()
    }

    pub fn header_row(&self) -> Row {
        self.header().iter().map(|h| h.to_string()).collect()
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
