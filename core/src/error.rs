use thiserror::Error;

use crate::error_codes;

/// Failures raised while loading, transforming or writing a [`crate::Table`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TableError {
    #[error("unsupported file format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("table has {0} columns; XLSX output supports at most 16384")]
    TooManyColumns(usize),
}

impl TableError {
    pub fn code(&self) -> &'static str {
        match self {
            TableError::UnsupportedFormat(_) => error_codes::UNSUPPORTED_FORMAT,
            TableError::Read { .. } => error_codes::READ_FAILURE,
            TableError::Write { .. } => error_codes::WRITE_FAILURE,
            TableError::MissingColumn(_) => error_codes::MISSING_COLUMN,
            TableError::TooManyColumns(_) => error_codes::TOO_MANY_COLUMNS,
        }
    }

    pub(crate) fn read(path: &std::path::Path, reason: impl ToString) -> Self {
        TableError::Read {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: &std::path::Path, reason: impl ToString) -> Self {
        TableError::Write {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
