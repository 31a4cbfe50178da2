//! Writing a [`Table`] as a single-sheet `.xlsx` workbook.

use crate::addressing::MAX_COLUMNS;
use crate::error::TableError;
use crate::table::Table;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

const SHEET_NAME: &str = "Sheet1";

/// Writes every cell with `write_string`, so numeric-looking text such as
/// `007` or `1.50` survives unchanged. Empty cells are left unwritten.
pub fn write_table(table: &Table, path: &Path) -> Result<(), TableError> {
    if table.column_count() > MAX_COLUMNS as usize {
        return Err(TableError::TooManyColumns(table.column_count()));
    }
    build_workbook(table)
        .and_then(|mut workbook| workbook.save(path))
        .map_err(|e| TableError::write(path, e))
}

fn build_workbook(table: &Table) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, name) in table.columns().iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name, &header_format)?;
        }

        for (idx, row) in table.rows().iter().enumerate() {
            let row_num = (idx + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                sheet.write_string(row_num, col as u16, value)?;
            }
        }
    }

    Ok(workbook)
}
