use dataset_core::TableError;
use thiserror::Error;

use crate::blob::BlobError;
use crate::store::StoreError;

/// Error kinds reported at every lifecycle operation boundary.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unsupported file format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("a project named '{0}' already exists; choose a different project name")]
    NameCollision(String),
    #[error("could not read dataset: {0}")]
    ReadFailure(String),
    #[error("store operation failed: {0}")]
    StoreFailure(String),
    #[error("{step} failed: {reason}")]
    PartialFailure { step: &'static str, reason: String },
}

impl DatasetError {
    pub fn code(&self) -> &'static str {
        match self {
            DatasetError::Validation(_) => "VALIDATION",
            DatasetError::NotFound(_) => "NOT_FOUND",
            DatasetError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DatasetError::MissingColumn(_) => "MISSING_COLUMN",
            DatasetError::NameCollision(_) => "NAME_COLLISION",
            DatasetError::ReadFailure(_) => "READ_FAILURE",
            DatasetError::StoreFailure(_) => "STORE_FAILURE",
            DatasetError::PartialFailure { .. } => "PARTIAL_FAILURE",
        }
    }

    pub(crate) fn partial(step: &'static str, reason: impl ToString) -> Self {
        DatasetError::PartialFailure {
            step,
            reason: reason.to_string(),
        }
    }
}

impl From<TableError> for DatasetError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::UnsupportedFormat(ext) => DatasetError::UnsupportedFormat(ext),
            TableError::MissingColumn(column) => DatasetError::MissingColumn(column),
            other => DatasetError::ReadFailure(other.to_string()),
        }
    }
}

impl From<StoreError> for DatasetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingProject(id) => DatasetError::NotFound(format!("project not found: {id}")),
            StoreError::MissingVersion(id) => DatasetError::NotFound(format!("version not found: {id}")),
            other => DatasetError::StoreFailure(other.to_string()),
        }
    }
}

impl From<BlobError> for DatasetError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NameCollision(name) => DatasetError::NameCollision(name),
            BlobError::NotFound(path) => DatasetError::NotFound(format!("file not found: {path}")),
            BlobError::InvalidName(name) => {
                DatasetError::Validation(format!("invalid file or project name: {name:?}"))
            }
            BlobError::OutsideRoot(path) => {
                DatasetError::Validation(format!("path is outside the dataset root: {path}"))
            }
            io @ BlobError::Io { .. } => DatasetError::StoreFailure(io.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetError;
    use crate::blob::BlobError;
    use crate::store::StoreError;
    use dataset_core::TableError;

    #[test]
    fn table_errors_keep_their_kind() {
        let err: DatasetError = TableError::MissingColumn("Tag Type".into()).into();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "Tag Type"));
        let err: DatasetError = TableError::UnsupportedFormat(".txt".into()).into();
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn missing_records_map_to_not_found() {
        let err: DatasetError = StoreError::MissingProject("p1".into()).into();
        assert_eq!(err.code(), "NOT_FOUND");
        let err: DatasetError = BlobError::NameCollision("Sales".into()).into();
        assert_eq!(err.code(), "NAME_COLLISION");
        assert!(err.to_string().contains("Sales"));
    }
}
