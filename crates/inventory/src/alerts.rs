//! Low-stock check and the alert emails it sends.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stockwatch_core::cell::{format_bool, format_number};
use stockwatch_core::{Clock, EmailMessage, MailError, Mailer, StoreResult, Table, TableStore};

use crate::records::{InventoryRow, ReorderHistoryEntry, Stock, StockFlag, inventory_col, read_inventory};

/// Who receives reorder notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecipients {
    pub vendor: String,
    pub owner: String,
}

/// Per-row outcome of the alert check. Pure function of the row.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// Row has no item name.
    Skip,
    /// Quantity/threshold invalid: record the flag, never alert.
    Flag(StockFlag),
    /// At or below threshold and not yet alerted.
    Alert(Stock),
    /// At or below threshold but the alert-sent flag is still set.
    AlreadyAlerted,
    /// Above threshold.
    Sufficient,
}

pub fn decide(row: &InventoryRow) -> AlertDecision {
    if row.item.is_empty() {
        return AlertDecision::Skip;
    }
    match row.stock() {
        Err(flag) => AlertDecision::Flag(flag),
        Ok(stock) if !stock.needs_reorder() => AlertDecision::Sufficient,
        Ok(_) if row.alert_sent => AlertDecision::AlreadyAlerted,
        Ok(stock) => AlertDecision::Alert(stock),
    }
}

pub fn vendor_email(recipients: &AlertRecipients, item: &str, stock: &Stock) -> EmailMessage {
    EmailMessage::new(
        recipients.vendor.clone(),
        format!("Reorder Request: {item}"),
        format!(
            "Hello,\n\n\
             Please arrange a restock of {item}.\n\n\
             Current quantity: {}\n\
             Reorder threshold: {}\n\n\
             Thank you.",
            format_number(stock.quantity),
            format_number(stock.threshold),
        ),
    )
}

pub fn owner_email(recipients: &AlertRecipients, item: &str, stock: &Stock) -> EmailMessage {
    EmailMessage::new(
        recipients.owner.clone(),
        format!("Low Stock Alert: {item}"),
        format!(
            "{item} is at or below its reorder threshold.\n\n\
             Current quantity: {}\n\
             Reorder threshold: {}\n\n\
             A reorder request has been sent to the vendor ({}).",
            format_number(stock.quantity),
            format_number(stock.threshold),
            recipients.vendor,
        ),
    )
}

/// Summary of one alert check run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertCheckReport {
    pub scanned: usize,
    pub alerted: Vec<String>,
    pub flagged: Vec<(String, StockFlag)>,
    /// Rows whose notification could not be delivered; left un-alerted.
    pub failed: Vec<(String, MailError)>,
}

/// Scan Inventory Master and send reorder alerts.
///
/// - Invalid rows get their flag written and are skipped.
/// - Rows at/below threshold with the alert-sent flag clear get a vendor and
///   an owner email, then `Alert Sent = TRUE` and one Reorder History entry.
/// - If either email fails the row is not marked; the next run retries it.
///
/// There is no transaction: a failure after the emails went out but before
/// the flag is persisted will cause a repeat alert on the next run.
pub fn check_inventory_levels<S, M, C>(
    store: &S,
    mailer: &M,
    clock: &C,
    recipients: &AlertRecipients,
) -> StoreResult<AlertCheckReport>
where
    S: TableStore + ?Sized,
    M: Mailer + ?Sized,
    C: Clock + ?Sized,
{
    let rows = read_inventory(&store.read_rows(Table::InventoryMaster)?);
    let mut report = AlertCheckReport {
        scanned: rows.len(),
        ..Default::default()
    };

    for row in &rows {
        match decide(row) {
            AlertDecision::Skip | AlertDecision::Sufficient | AlertDecision::AlreadyAlerted => {}
            AlertDecision::Flag(flag) => {
                warn!(item = %row.item, row = row.position, flag = flag.as_str(), "inventory row flagged");
                if row.flag != flag.as_str() {
                    store.write_cell(Table::InventoryMaster, row.position, inventory_col::FLAG, flag.as_str())?;
                }
                report.flagged.push((row.item.clone(), flag));
            }
            AlertDecision::Alert(stock) => {
                if let Err(e) = send_alerts(mailer, recipients, &row.item, &stock) {
                    warn!(item = %row.item, error = %e, "reorder alert not delivered");
                    report.failed.push((row.item.clone(), e));
                    continue;
                }

                store.write_cell(
                    Table::InventoryMaster,
                    row.position,
                    inventory_col::ALERT_SENT,
                    format_bool(true),
                )?;

                let entry = ReorderHistoryEntry {
                    timestamp: clock.now(),
                    item: row.item.clone(),
                    quantity: stock.quantity,
                    threshold: stock.threshold,
                };
                store.append_row(Table::ReorderHistory, entry.to_row())?;

                debug!(item = %row.item, quantity = stock.quantity, threshold = stock.threshold, "reorder alert sent");
                report.alerted.push(row.item.clone());
            }
        }
    }

    info!(
        scanned = report.scanned,
        alerted = report.alerted.len(),
        flagged = report.flagged.len(),
        failed = report.failed.len(),
        "inventory check finished"
    );

    Ok(report)
}

fn send_alerts<M>(mailer: &M, recipients: &AlertRecipients, item: &str, stock: &Stock) -> Result<(), MailError>
where
    M: Mailer + ?Sized,
{
    mailer.send(&vendor_email(recipients, item, stock))?;
    mailer.send(&owner_email(recipients, item, stock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stockwatch_core::{FixedClock, InMemoryTableStore, RecordingMailer, Row};

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn recipients() -> AlertRecipients {
        AlertRecipients {
            vendor: "vendor@example.com".to_string(),
            owner: "owner@example.com".to_string(),
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
    }

    fn store_with(inventory: Vec<Row>) -> InMemoryTableStore {
        InMemoryTableStore::provisioned().with_rows(Table::InventoryMaster, inventory)
    }

    #[test]
    fn low_stock_sends_two_emails_marks_row_and_appends_history() {
        let store = store_with(vec![
            row(&["Widget", "3", "5", "FALSE", ""]),
            row(&["Gadget", "50", "5", "FALSE", ""]),
        ]);
        let mailer = RecordingMailer::new();

        let report = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert_eq!(report.alerted, vec!["Widget".to_string()]);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "vendor@example.com");
        assert_eq!(sent[0].subject, "Reorder Request: Widget");
        assert_eq!(sent[1].to, "owner@example.com");
        assert_eq!(sent[1].subject, "Low Stock Alert: Widget");
        assert_ne!(sent[0].body, sent[1].body);
        assert!(sent[0].body.contains("Current quantity: 3"));
        assert!(sent[1].body.contains("Reorder threshold: 5"));

        let inventory = store.read_rows(Table::InventoryMaster).unwrap();
        assert_eq!(inventory[0][3], "TRUE");
        assert_eq!(inventory[1][3], "FALSE");

        let history = store.read_rows(Table::ReorderHistory).unwrap();
        assert_eq!(
            history,
            vec![row(&["2024-06-01T08:00:00Z", "Widget", "3", "5", "Alert Sent"])]
        );
    }

    #[test]
    fn quantity_equal_to_threshold_alerts() {
        let store = store_with(vec![row(&["Bolt", "5", "5", "", ""])]);
        let mailer = RecordingMailer::new();

        let report = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert_eq!(report.alerted, vec!["Bolt".to_string()]);
    }

    #[test]
    fn second_run_is_a_no_op_for_alerted_rows() {
        let store = store_with(vec![row(&["Widget", "1", "5", "FALSE", ""])]);
        let mailer = RecordingMailer::new();

        check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();
        let second = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert!(second.alerted.is_empty());
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(store.read_rows(Table::ReorderHistory).unwrap().len(), 1);
    }

    #[test]
    fn alert_flag_is_not_cleared_when_stock_recovers() {
        let store = store_with(vec![row(&["Widget", "100", "5", "TRUE", ""])]);
        let mailer = RecordingMailer::new();

        check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert_eq!(store.read_rows(Table::InventoryMaster).unwrap()[0][3], "TRUE");
    }

    #[test]
    fn invalid_rows_are_flagged_and_never_alerted() {
        let store = store_with(vec![
            row(&["Text", "abc", "5", "FALSE", ""]),
            row(&["Neg", "-5", "5", "FALSE", ""]),
            row(&["", "1", "5", "FALSE", ""]),
        ]);
        let mailer = RecordingMailer::new();

        let report = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert!(report.alerted.is_empty());
        assert!(mailer.sent().is_empty());
        let inventory = store.read_rows(Table::InventoryMaster).unwrap();
        assert_eq!(inventory[0][4], "Invalid qty/threshold");
        assert_eq!(inventory[1][4], "Negative quantity!");
        assert_eq!(inventory[2][4], "");
        assert_eq!(inventory[1][3], "FALSE");
        assert!(store.read_rows(Table::ReorderHistory).unwrap().is_empty());
    }

    #[test]
    fn failed_delivery_leaves_row_unalerted() {
        let store = store_with(vec![row(&["Widget", "1", "5", "FALSE", ""])]);
        let mailer = RecordingMailer::new().fail_for("owner@example.com");

        let report = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(report.alerted.is_empty());
        assert_eq!(store.read_rows(Table::InventoryMaster).unwrap()[0][3], "FALSE");
        assert!(store.read_rows(Table::ReorderHistory).unwrap().is_empty());
    }

    #[test]
    fn missing_inventory_table_is_a_store_error() {
        let store = InMemoryTableStore::new();
        let mailer = RecordingMailer::new();
        assert!(check_inventory_levels(&store, &mailer, &clock(), &recipients()).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: an alert fires iff quantity <= threshold and the flag was clear,
            /// and firing sets the flag and appends exactly one history entry.
            #[test]
            fn alert_fires_iff_low_and_not_yet_alerted(
                quantity in 0u32..1000,
                threshold in 0u32..1000,
                alert_sent in any::<bool>(),
            ) {
                let store = store_with(vec![row(&[
                    "Item",
                    &quantity.to_string(),
                    &threshold.to_string(),
                    format_bool(alert_sent),
                    "",
                ])]);
                let mailer = RecordingMailer::new();

                let report = check_inventory_levels(&store, &mailer, &clock(), &recipients()).unwrap();

                let expected = quantity <= threshold && !alert_sent;
                prop_assert_eq!(report.alerted.len(), usize::from(expected));
                prop_assert_eq!(mailer.sent().len(), if expected { 2 } else { 0 });
                prop_assert_eq!(
                    store.read_rows(Table::ReorderHistory).unwrap().len(),
                    usize::from(expected)
                );
                let flag_now = store.read_rows(Table::InventoryMaster).unwrap()[0][3].clone();
                prop_assert_eq!(flag_now, format_bool(alert_sent || expected).to_string());
            }
        }
    }
}
