mod catalog;

use crate::model::{NewProject, Project, ProjectSettings, TagPartition, VersionNumber, VersionRecord, VersionRef};
use thiserror::Error;

pub use catalog::Catalog;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing project: {0}")]
    MissingProject(String),
    #[error("Missing version: {0}")]
    MissingVersion(String),
    #[error("Invalid store data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Where the project pointer moves after a whole-dataset transition.
#[derive(Debug, Clone)]
pub struct ProjectAdvance {
    pub file_path: String,
    pub version_number: VersionNumber,
    pub append_versions: Vec<VersionRef>,
}

/// Project records: identity, the current-file pointer and the version log.
pub trait ProjectStore: Send + Sync {
    fn create_project(&self, new: &NewProject) -> Result<Project, StoreError>;

    fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError>;

    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Moves `file_path`/`version_number` and appends to the version log in
    /// one write.
    fn advance_project(&self, project_id: &str, advance: &ProjectAdvance) -> Result<(), StoreError>;

    /// Replaces `file_path` with the partition sentinel, stores the
    /// partition descriptors and appends their log entries in one write.
    fn mark_partitioned(
        &self,
        project_id: &str,
        partitions: &[TagPartition],
        version_number: VersionNumber,
    ) -> Result<(), StoreError>;

    fn update_settings(&self, project_id: &str, settings: &ProjectSettings) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    fn delete_project(&self, project_id: &str) -> Result<bool, StoreError>;
}

/// Append-only record of materialized files.
pub trait VersionLedger: Send + Sync {
    fn record(
        &self,
        project_id: &str,
        description: &str,
        file_path: &str,
        version_number: VersionNumber,
    ) -> Result<String, StoreError>;

    fn get_version(&self, version_id: &str) -> Result<Option<VersionRecord>, StoreError>;

    /// Entries for a project in the order they were recorded.
    fn list_versions(&self, project_id: &str) -> Result<Vec<VersionRecord>, StoreError>;

    /// Administrative path patch; the lifecycle flows never call it.
    fn update_file_location(&self, version_id: &str, file_path: &str) -> Result<bool, StoreError>;

    /// Compensation and cascade only.
    fn delete_version(&self, version_id: &str) -> Result<bool, StoreError>;
}
