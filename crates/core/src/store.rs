//! Tabular store abstraction.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::table::{Row, Table};

/// Positional table storage (the workbook).
///
/// Rows are addressed by their 0-based position among *data* rows (the header
/// is never returned by `read_rows`) and columns are 1-based, matching the
/// header order of [`Table::header`].
///
/// There is no transaction and no isolation: callers read a full snapshot and
/// then write individual cells.
pub trait TableStore: Send + Sync {
    fn table_exists(&self, table: Table) -> StoreResult<bool>;

    /// Create an empty table holding only its header row.
    fn create_table(&self, table: Table) -> StoreResult<()>;

    /// All data rows, in storage order.
    fn read_rows(&self, table: Table) -> StoreResult<Vec<Row>>;

    fn write_cell(&self, table: Table, row: usize, column: usize, value: &str) -> StoreResult<()>;

    fn append_row(&self, table: Table, row: Row) -> StoreResult<()>;

    /// Drop every data row and rewrite the header.
    fn reset_table(&self, table: Table) -> StoreResult<()>;
}

impl<S> TableStore for Arc<S>
where
    S: TableStore + ?Sized,
{
    fn table_exists(&self, table: Table) -> StoreResult<bool> {
        (**self).table_exists(table)
    }

    fn create_table(&self, table: Table) -> StoreResult<()> {
        (**self).create_table(table)
    }

    fn read_rows(&self, table: Table) -> StoreResult<Vec<Row>> {
        (**self).read_rows(table)
    }

    fn write_cell(&self, table: Table, row: usize, column: usize, value: &str) -> StoreResult<()> {
        (**self).write_cell(table, row, column, value)
    }

    fn append_row(&self, table: Table, row: Row) -> StoreResult<()> {
        (**self).append_row(table, row)
    }

    fn reset_table(&self, table: Table) -> StoreResult<()> {
        (**self).reset_table(table)
    }
}

/// Validate a 1-based column against the table width.
pub fn check_column(table: Table, column: usize) -> StoreResult<usize> {
    if column == 0 || column > table.width() {
        return Err(StoreError::InvalidColumn { table, column });
    }
    Ok(column - 1)
}

/// Set a cell in a positional row, growing the row with empty cells as needed.
pub fn set_cell(row: &mut Row, index: usize, value: &str) {
    if row.len() <= index {
        row.resize(index + 1, String::new());
    }
    row[index] = value.to_string();
}

/// In-memory workbook for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    inner: RwLock<BTreeMap<Table, Vec<Row>>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with all four tables already provisioned.
    pub fn provisioned() -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.inner.write() {
            for table in Table::ALL {
                tables.insert(table, Vec::new());
            }
        }
        store
    }

    /// Seed a table with data rows (creating it if needed).
    pub fn with_rows(self, table: Table, rows: Vec<Row>) -> Self {
        if let Ok(mut tables) = self.inner.write() {
            tables.insert(table, rows);
        }
        self
    }

    fn poisoned() -> StoreError {
        StoreError::storage("in-memory store lock poisoned")
    }
}

impl TableStore for InMemoryTableStore {
    fn table_exists(&self, table: Table) -> StoreResult<bool> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables.contains_key(&table))
    }

    fn create_table(&self, table: Table) -> StoreResult<()> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        if tables.contains_key(&table) {
            return Err(StoreError::TableExists(table));
        }
        tables.insert(table, Vec::new());
        Ok(())
    }

    fn read_rows(&self, table: Table) -> StoreResult<Vec<Row>> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        tables
            .get(&table)
            .cloned()
            .ok_or(StoreError::TableNotFound(table))
    }

    fn write_cell(&self, table: Table, row: usize, column: usize, value: &str) -> StoreResult<()> {
        let index = check_column(table, column)?;
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        let rows = tables.get_mut(&table).ok_or(StoreError::TableNotFound(table))?;
        let target = rows
            .get_mut(row)
            .ok_or(StoreError::RowOutOfRange { table, row })?;
        set_cell(target, index, value);
        Ok(())
    }

    fn append_row(&self, table: Table, row: Row) -> StoreResult<()> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        let rows = tables.get_mut(&table).ok_or(StoreError::TableNotFound(table))?;
        rows.push(row);
        Ok(())
    }

    fn reset_table(&self, table: Table) -> StoreResult<()> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        tables.insert(table, Vec::new());
        Ok(())
    }
}
