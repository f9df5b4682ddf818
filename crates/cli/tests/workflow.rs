use std::sync::Arc;

use stockwatch::{App, Command};
use stockwatch_ai::PredictionOutcome;
use stockwatch_core::{Handler, StaticSecrets, Table, TableStore};
use stockwatch_infra::{Config, Dispatch};

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.alerts.vendor_email = "orders@vendor.test".to_string();
    config.alerts.owner_email = "owner@shop.test".to_string();
    config.prediction.api_key_env = "STOCKWATCH_TEST_UNSET_KEY".to_string();
    config.resolve_paths(dir);
    config
}

fn app(config: Config) -> App {
    App::with_secrets(config, Arc::new(StaticSecrets::new())).unwrap()
}

#[test]
fn usage_then_check_alerts_once_and_records_history() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let outbox = config.mail.outbox_path.clone();

    app(config.clone()).run(Command::Setup).unwrap();
    let app = app(config);
    assert_eq!(app.triggers().unwrap().len(), 2);

    let book = app.workbook();
    book.append_row(Table::InventoryMaster, row(&["Widget", "12", "10", "FALSE", ""]))
        .unwrap();
    book.append_row(Table::InventoryMaster, row(&["Gadget", "-1", "5", "FALSE", ""]))
        .unwrap();
    book.append_row(
        Table::UsageLog,
        row(&["2024-06-01T08:00:00Z", "Widget", "5", "line 2", ""]),
    )
    .unwrap();

    let reconciled = app.apply_usage().unwrap();
    assert_eq!(reconciled.applied, 1);

    let report = app.check().unwrap();
    assert_eq!(report.alerted, vec!["Widget".to_string()]);
    assert_eq!(report.flagged.len(), 1);

    let inventory = book.read_rows(Table::InventoryMaster).unwrap();
    assert_eq!(inventory[0], row(&["Widget", "7", "10", "TRUE", ""]));
    assert_eq!(inventory[1][4], "Negative quantity!");
    assert_eq!(book.read_rows(Table::ReorderHistory).unwrap().len(), 1);
    assert_eq!(std::fs::read_to_string(&outbox).unwrap().lines().count(), 2);

    // Sticky flag: a second check sends nothing.
    let again = app.check().unwrap();
    assert!(again.alerted.is_empty());
    assert_eq!(std::fs::read_to_string(&outbox).unwrap().lines().count(), 2);

    app.reset_alert("  Widget ").unwrap();
    assert_eq!(book.read_rows(Table::InventoryMaster).unwrap()[0][3], "FALSE");
    assert!(app.reset_alert("Sprocket").is_err());
}

#[test]
fn prediction_without_key_leaves_sentinel_row() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config(dir.path()));
    app.setup().unwrap();

    let outcome = app.predict().unwrap();

    assert_eq!(
        outcome,
        PredictionOutcome::Failed("Missing Gemini API key credential".to_string())
    );
    let rows = app.workbook().read_rows(Table::AiPredictions).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "ERROR");
}

#[test]
fn dispatch_routes_handlers_to_procedures() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config(dir.path()));
    app.setup().unwrap();

    app.dispatch(Handler::ApplyUsageLog).unwrap();
    app.dispatch(Handler::CheckInventoryLevels).unwrap();
    app.dispatch(Handler::RunAiPrediction).unwrap();
    assert_eq!(app.workbook().read_rows(Table::AiPredictions).unwrap().len(), 1);
}

#[test]
fn check_without_recipients_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.alerts.owner_email.clear();
    let app = app(config);
    app.setup().unwrap();

    let err = app.check().unwrap_err();
    assert!(err.to_string().contains("alerts.vendor_email"));
}

#[test]
fn procedures_before_setup_report_missing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config(dir.path()));

    let err = app.apply_usage().unwrap_err();
    assert!(format!("{err:#}").contains("table not found"));
}
