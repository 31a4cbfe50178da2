//! File-extension dispatch between the CSV and XLSX codecs.

use crate::error::TableError;
use crate::table::Table;
use crate::{csv_codec, xlsx_reader, xlsx_writer};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            _ => Err(TableError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Extension including the leading dot, as used in derived file names.
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => ".csv",
            TableFormat::Xlsx => ".xlsx",
        }
    }
}

pub fn load(path: &Path) -> Result<Table, TableError> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => csv_codec::read_table(path),
        TableFormat::Xlsx => {
            xlsx_reader::read_first_sheet(path).map_err(|e| TableError::read(path, e))
        }
    }
}

/// Column names only; reads no further than the header row.
pub fn load_header_only(path: &Path) -> Result<Vec<String>, TableError> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => csv_codec::read_header(path),
        TableFormat::Xlsx => {
            xlsx_reader::read_first_sheet_header(path).map_err(|e| TableError::read(path, e))
        }
    }
}

/// Writes `table` in the format implied by the extension of `path`.
pub fn save(table: &Table, path: &Path) -> Result<(), TableError> {
    save_as(table, path, TableFormat::from_path(path)?)
}

pub fn save_as(table: &Table, path: &Path, format: TableFormat) -> Result<(), TableError> {
    match format {
        TableFormat::Csv => csv_codec::write_table(table, path),
        TableFormat::Xlsx => xlsx_writer::write_table(table, path),
    }
}

#[cfg(test)]
mod tests {
    use super::TableFormat;
    use crate::error::TableError;
    use std::path::Path;

    #[test]
    fn format_dispatch_is_case_insensitive() {
        assert_eq!(TableFormat::from_path(Path::new("a/b.CSV")).ok(), Some(TableFormat::Csv));
        assert_eq!(TableFormat::from_path(Path::new("b.xlsx")).ok(), Some(TableFormat::Xlsx));
    }

    #[test]
    fn other_extensions_are_unsupported() {
        for name in ["data.xls", "data.json", "data", "data.csv.gz"] {
            let err = TableFormat::from_path(Path::new(name)).expect_err("should be unsupported");
            assert!(matches!(err, TableError::UnsupportedFormat(_)), "{name}");
        }
    }
}
