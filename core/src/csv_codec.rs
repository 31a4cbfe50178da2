//! Delimited text input and output.

use crate::error::TableError;
use crate::table::{Table, normalize_headers};
use std::path::Path;

/// Reads a comma-separated file. The first record is the header; blank
/// lines are skipped and ragged records are fitted to the header width.
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let mut reader = open_reader(path)?;
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| TableError::read(path, e))?,
        None => return Err(TableError::read(path, "file has no header row")),
    };
    let mut table = Table::new(normalize_headers(
        header.iter().map(str::to_string).collect(),
    ));

    for record in records {
        let record = record.map_err(|e| TableError::read(path, e))?;
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

pub fn read_header(path: &Path) -> Result<Vec<String>, TableError> {
    let mut reader = open_reader(path)?;
    match reader.records().next() {
        Some(record) => {
            let record = record.map_err(|e| TableError::read(path, e))?;
            Ok(normalize_headers(record.iter().map(str::to_string).collect()))
        }
        None => Err(TableError::read(path, "file has no header row")),
    }
}

pub fn write_table(table: &Table, path: &Path) -> Result<(), TableError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_path(path)
        .map_err(|e| TableError::write(path, e))?;

    writer
        .write_record(table.columns())
        .map_err(|e| TableError::write(path, e))?;
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| TableError::write(path, e))?;
    }
    writer.flush().map_err(|e| TableError::write(path, e))
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, TableError> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableError::read(path, e))
}
