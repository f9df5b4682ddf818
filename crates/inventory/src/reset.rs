//! Manual re-arming of an item's alert flag.

use tracing::info;

use stockwatch_core::cell::format_bool;
use stockwatch_core::{StoreResult, Table, TableStore};

use crate::records::{inventory_col, read_inventory};

/// Clear the alert-sent flag of the first row named `item`.
///
/// Returns `false` (and writes nothing) when no row matches.
pub fn reset_alert_flag<S>(store: &S, item: &str) -> StoreResult<bool>
where
    S: TableStore + ?Sized,
{
    let wanted = item.trim();
    let rows = read_inventory(&store.read_rows(Table::InventoryMaster)?);

    let Some(row) = rows.iter().find(|r| !wanted.is_empty() && r.item == wanted) else {
        info!(item = wanted, "no inventory row to reset");
        return Ok(false);
    };

    store.write_cell(
        Table::InventoryMaster,
        row.position,
        inventory_col::ALERT_SENT,
        format_bool(false),
    )?;
    info!(item = wanted, row = row.position, "alert flag reset");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::{InMemoryTableStore, Row};

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn inventory() -> Vec<Row> {
        vec![
            row(&["A", "1", "5", "TRUE", ""]),
            row(&["B", "1", "5", "TRUE", ""]),
            row(&["C", "1", "5", "TRUE", ""]),
        ]
    }

    #[test]
    fn reset_touches_only_the_matching_row() {
        let store = InMemoryTableStore::provisioned().with_rows(Table::InventoryMaster, inventory());

        assert!(reset_alert_flag(&store, "C").unwrap());

        let rows = store.read_rows(Table::InventoryMaster).unwrap();
        assert_eq!(rows[0][3], "TRUE");
        assert_eq!(rows[1][3], "TRUE");
        assert_eq!(rows[2][3], "FALSE");
    }

    #[test]
    fn reset_of_unknown_item_is_a_no_op() {
        let store = InMemoryTableStore::provisioned().with_rows(Table::InventoryMaster, inventory());

        assert!(!reset_alert_flag(&store, "Nope").unwrap());
        assert!(!reset_alert_flag(&store, "").unwrap());

        assert_eq!(store.read_rows(Table::InventoryMaster).unwrap(), inventory());
    }

    #[test]
    fn first_matching_row_wins() {
        let store = InMemoryTableStore::provisioned().with_rows(
            Table::InventoryMaster,
            vec![row(&["A", "1", "5", "TRUE", ""]), row(&["A", "1", "5", "TRUE", ""])],
        );

        reset_alert_flag(&store, " A ").unwrap();

        let rows = store.read_rows(Table::InventoryMaster).unwrap();
        assert_eq!(rows[0][3], "FALSE");
        assert_eq!(rows[1][3], "TRUE");
    }
}
