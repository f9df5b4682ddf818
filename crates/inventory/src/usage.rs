//! Usage log reconciliation (snapshot-then-apply).

use std::collections::HashMap;

use tracing::{debug, info, warn};

use stockwatch_core::cell::format_number;
use stockwatch_core::{StoreResult, Table, TableStore};

use crate::records::{InventoryRow, UsageRow, UsageStatus, inventory_col, read_inventory, read_usage, usage_col};

/// Inventory quantities captured once at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    entries: HashMap<String, SnapshotEntry>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub position: usize,
    /// `None` when the stored quantity is not a number.
    pub quantity: Option<f64>,
}

impl InventorySnapshot {
    /// Index rows by item name; the first row wins for duplicate names.
    pub fn capture(rows: &[InventoryRow]) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows.iter().filter(|r| !r.item.is_empty()) {
            entries.entry(row.item.clone()).or_insert(SnapshotEntry {
                position: row.position,
                quantity: row.quantity,
            });
        }
        Self { entries }
    }

    pub fn get(&self, item: &str) -> Option<SnapshotEntry> {
        self.entries.get(item.trim()).copied()
    }
}

/// What reconciliation does with one usage row.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageAction {
    /// Already `APPLIED`; never touched again.
    AlreadyApplied,
    /// Record a terminal validation status.
    Mark(UsageStatus),
    /// The inventory row's own quantity is not numeric; left pending.
    StaleInventory { inventory_row: usize },
    /// Write `new_quantity` to the inventory row, then mark `APPLIED`.
    Apply {
        inventory_row: usize,
        base_quantity: f64,
        quantity_used: f64,
        new_quantity: f64,
    },
}

/// Decide the action for one usage row against the run's snapshot.
///
/// The base is always the snapshot value, never a value written earlier in
/// the same run: two usages of 3 and 4 against a stock of 10 yield 7 and then
/// 6, not 3. The result may go negative.
pub fn plan(snapshot: &InventorySnapshot, usage: &UsageRow) -> UsageAction {
    if usage.status == UsageStatus::Applied {
        return UsageAction::AlreadyApplied;
    }
    let Some(entry) = snapshot.get(&usage.item) else {
        return UsageAction::Mark(UsageStatus::UnknownItem);
    };
    let Some(quantity_used) = usage.used() else {
        return UsageAction::Mark(UsageStatus::InvalidQty);
    };
    let Some(base_quantity) = entry.quantity else {
        return UsageAction::StaleInventory {
            inventory_row: entry.position,
        };
    };
    UsageAction::Apply {
        inventory_row: entry.position,
        base_quantity,
        quantity_used,
        new_quantity: base_quantity - quantity_used,
    }
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub applied: usize,
    pub already_applied: usize,
    pub unknown_item: usize,
    pub invalid_qty: usize,
    /// Usage rows left pending because the inventory quantity is not numeric.
    pub left_pending: usize,
}

/// Apply every pending usage row to Inventory Master.
pub fn apply_usage_log<S>(store: &S) -> StoreResult<ReconcileReport>
where
    S: TableStore + ?Sized,
{
    let inventory = read_inventory(&store.read_rows(Table::InventoryMaster)?);
    let usage = read_usage(&store.read_rows(Table::UsageLog)?);
    let snapshot = InventorySnapshot::capture(&inventory);

    let mut report = ReconcileReport::default();

    for row in &usage {
        match plan(&snapshot, row) {
            UsageAction::AlreadyApplied => report.already_applied += 1,
            UsageAction::Mark(status) => {
                warn!(item = %row.item, row = row.position, status = status.as_str(), "usage row rejected");
                if row.status != status {
                    store.write_cell(Table::UsageLog, row.position, usage_col::STATUS, status.as_str())?;
                }
                match status {
                    UsageStatus::UnknownItem => report.unknown_item += 1,
                    _ => report.invalid_qty += 1,
                }
            }
            UsageAction::StaleInventory { inventory_row } => {
                warn!(
                    item = %row.item,
                    row = row.position,
                    inventory_row,
                    "inventory quantity is not numeric; usage left pending"
                );
                report.left_pending += 1;
            }
            UsageAction::Apply {
                inventory_row,
                base_quantity,
                quantity_used,
                new_quantity,
            } => {
                store.write_cell(
                    Table::InventoryMaster,
                    inventory_row,
                    inventory_col::QUANTITY,
                    &format_number(new_quantity),
                )?;
                store.write_cell(
                    Table::UsageLog,
                    row.position,
                    usage_col::STATUS,
                    UsageStatus::Applied.as_str(),
                )?;
                debug!(item = %row.item, base_quantity, quantity_used, new_quantity, "usage applied");
                report.applied += 1;
            }
        }
    }

    info!(
        applied = report.applied,
        already_applied = report.already_applied,
        unknown_item = report.unknown_item,
        invalid_qty = report.invalid_qty,
        left_pending = report.left_pending,
        "usage reconciliation finished"
    );

    Ok(report)
}
