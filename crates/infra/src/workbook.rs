//! CSV-backed workbook: one `<table>.csv` file per table in a directory.
//!
//! The first record of every file is the header; data row `0` is the second
//! record. Rewrites go through a temporary file and a rename so a crash never
//! leaves a half-written table.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use stockwatch_core::store::{check_column, set_cell};
use stockwatch_core::{Row, StoreError, StoreResult, Table, TableStore};

#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    /// Open (creating if needed) the workbook directory.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.csv", table.slug()))
    }

    /// All records, header included.
    fn load(&self, table: Table) -> StoreResult<Vec<Row>> {
        let path = self.path(table);
        if !path.is_file() {
            return Err(StoreError::TableNotFound(table));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| csv_error(table, e))?;

        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| csv_error(table, e))
            })
            .collect()
    }

    fn save(&self, table: Table, records: &[Row]) -> StoreResult<()> {
        let path = self.path(table);
        let tmp = path.with_extension("csv.tmp");

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&tmp)
            .map_err(|e| csv_error(table, e))?;
        for record in records {
            writer.write_record(record).map_err(|e| csv_error(table, e))?;
        }
        writer
            .flush()
            .map_err(|e| StoreError::storage(format!("flush {}: {e}", tmp.display())))?;
        drop(writer);

        fs::rename(&tmp, &path)
            .map_err(|e| StoreError::storage(format!("replace {}: {e}", path.display())))?;
        debug!(table = %table, rows = records.len().saturating_sub(1), "table saved");
        Ok(())
    }
}

fn csv_error(table: Table, err: csv::Error) -> StoreError {
    if err.is_io_error() {
        StoreError::storage(format!("{table}: {err}"))
    } else {
        StoreError::malformed(table, err.to_string())
    }
}

impl TableStore for CsvWorkbook {
    fn table_exists(&self, table: Table) -> StoreResult<bool> {
        Ok(self.path(table).is_file())
    }

    fn create_table(&self, table: Table) -> StoreResult<()> {
        if self.table_exists(table)? {
            return Err(StoreError::TableExists(table));
        }
        self.save(table, &[table.header_row()])
    }

    fn read_rows(&self, table: Table) -> StoreResult<Vec<Row>> {
        let mut records = self.load(table)?;
        if records.is_empty() {
            return Ok(records);
        }
        records.remove(0);
        Ok(records)
    }

    fn write_cell(&self, table: Table, row: usize, column: usize, value: &str) -> StoreResult<()> {
        let index = check_column(table, column)?;
        let mut records = self.load(table)?;
        if records.is_empty() {
            records.push(table.header_row());
        }
        let record = records
            .get_mut(row + 1)
            .ok_or(StoreError::RowOutOfRange { table, row })?;
        set_cell(record, index, value);
        self.save(table, &records)
    }

    fn append_row(&self, table: Table, row: Row) -> StoreResult<()> {
        let path = self.path(table);
        if !path.is_file() {
            return Err(StoreError::TableNotFound(table));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::storage(format!("open {}: {e}", path.display())))?;
        terminate_last_line(&mut file)
            .map_err(|e| StoreError::storage(format!("append {}: {e}", path.display())))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        writer.write_record(&row).map_err(|e| csv_error(table, e))?;
        writer
            .flush()
            .map_err(|e| StoreError::storage(format!("flush {}: {e}", path.display())))
    }

    fn reset_table(&self, table: Table) -> StoreResult<()> {
        self.save(table, &[table.header_row()])
    }
}

/// Hand-edited files may end without a newline; the next record must not
/// join the last line.
fn terminate_last_line(file: &mut fs::File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}
