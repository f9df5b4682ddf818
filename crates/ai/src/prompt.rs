//! Prompt construction for the stockout prediction request.

use serde::Serialize;
use serde_json::{Map, Value};

use stockwatch_core::cell::parse_number;
use stockwatch_core::{Row, Table};

/// Columns rendered as JSON numbers when they parse as one.
const NUMERIC_COLUMNS: &[&str] = &["Quantity", "Threshold", "Quantity Used"];

/// Both tables as header-keyed JSON records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInput {
    pub inventory: Vec<Map<String, Value>>,
    pub usage: Vec<Map<String, Value>>,
}

impl PredictionInput {
    pub fn from_tables(inventory: &[Row], usage: &[Row]) -> Self {
        Self {
            inventory: table_records(Table::InventoryMaster, inventory),
            usage: table_records(Table::UsageLog, usage),
        }
    }
}

fn table_records(table: Table, rows: &[Row]) -> Vec<Map<String, Value>> {
    rows.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            table
                .header()
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    (column.to_string(), cell_value(column, raw))
                })
                .collect()
        })
        .collect()
}

fn cell_value(column: &str, raw: &str) -> Value {
    if NUMERIC_COLUMNS.contains(&column) {
        if let Some(n) = parse_number(raw).and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Natural-language instructions followed by both tables as JSON.
pub fn build_prompt(input: &PredictionInput) -> String {
    let inventory = pretty_records(&input.inventory);
    let usage = pretty_records(&input.usage);

    format!(
        "You are an inventory planning assistant.\n\
         Using the current stock levels and the usage history below, identify the items \
         at risk of running out of stock within the next 30 days.\n\n\
         Respond with a JSON array only. Each element must be an object with:\n\
         - \"item\": the item name exactly as it appears in the inventory\n\
         - \"confidence\": a number between 0 and 1 giving the likelihood of a stockout\n\
         - \"notes\": a short explanation\n\n\
         Inventory Master:\n{inventory}\n\n\
         Usage Log:\n{usage}\n"
    )
}

fn pretty_records(records: &[Map<String, Value>]) -> String {
    format!("{:#}", Value::Array(records.iter().cloned().map(Value::Object).collect()))
}
