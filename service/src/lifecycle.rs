//! The project state machine.
//!
//! A project moves `Uploaded(v0) -> Cleaned(v1) -> Renamed(v2) ->
//! Partitioned(v2.1..v2.N)` and never back. Each transition writes a new
//! file through the [`BlobStore`], records it in the [`VersionLedger`], and
//! only then moves the project pointer in the [`ProjectStore`].
//!
//! Ingest and rename undo what they wrote when a later step fails (see
//! [`Compensation`]). Partition does not: partitions written before a
//! failure stay on disk and in the ledger, and the failure names them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use dataset_core::{
    TableFormat, TablePreview, TagColumns, TagSummary, deduplicate, drop_empty_rows, load,
    load_header_only, partition_by_tag, partition_file_name, rename_columns, save, summarize_tags,
    unmatched_mapping_keys,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::error::DatasetError;
use crate::locks::{ProjectLocks, acquire};
use crate::model::{
    NewProject, Project, ProjectSettings, TagPartition, VersionNumber, VersionRecord, VersionRef,
};
use crate::store::{ProjectAdvance, ProjectStore, VersionLedger};

/// Rows returned by the project data preview.
pub const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub user_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub remove_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub project_id: String,
    pub v0_id: String,
    pub v1_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    pub project_id: String,
    pub version_id: String,
    pub file_path: String,
    pub columns: Vec<String>,
    /// Mapping keys that matched no column; they were ignored.
    pub unmatched_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionOutcome {
    pub project_id: String,
    pub partitions: Vec<TagPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Orchestrates the blob store, project store and ledger for one request.
pub struct ProjectLifecycle<'a> {
    blobs: &'a BlobStore,
    projects: &'a dyn ProjectStore,
    ledger: &'a dyn VersionLedger,
    locks: &'a ProjectLocks,
}

impl<'a> ProjectLifecycle<'a> {
    pub fn new(
        blobs: &'a BlobStore,
        projects: &'a dyn ProjectStore,
        ledger: &'a dyn VersionLedger,
        locks: &'a ProjectLocks,
    ) -> Self {
        Self {
            blobs,
            projects,
            ledger,
            locks,
        }
    }

    /// `Uploaded -> Cleaned`: stores the raw file as v0, writes the cleaned
    /// table as `{base}_v1{ext}` and points the project at it.
    pub fn ingest(&self, request: UploadRequest) -> Result<IngestOutcome, DatasetError> {
        let name = required(&request.name, "name")?;
        let user_id = required(&request.user_id, "user_id")?;
        let filename = required(&request.filename, "file")?;
        TableFormat::from_path(Path::new(filename))?;

        let raw_path = self
            .blobs
            .put_new_project(name, filename, &request.bytes)?;
        let raw_location = display(&raw_path);
        let mut undo = Compensation::new("ingest");
        undo.push(Undo::RemoveProjectDir(name.to_string()));

        let project = match self.projects.create_project(&NewProject {
            user_id: user_id.to_string(),
            name: name.to_string(),
            file_path: raw_location.clone(),
            remove_duplicates: request.remove_duplicates,
        }) {
            Ok(project) => project,
            Err(err) => return Err(undo.fail(self, DatasetError::partial("create project", err))),
        };
        let project_id = project.project_id;
        undo.push(Undo::DeleteProject(project_id.clone()));
        info!(project_id = %project_id, name, "project created");

        let v0_id = match self
            .ledger
            .record(&project_id, "Raw upload", &raw_location, VersionNumber::RAW)
        {
            Ok(id) => id,
            Err(err) => return Err(undo.fail(self, DatasetError::partial("record v0", err))),
        };
        undo.push(Undo::DeleteVersion(v0_id.clone()));

        let table = match load(&raw_path) {
            Ok(table) => table,
            Err(err) => return Err(undo.fail(self, err.into())),
        };
        let before = table.row_count();
        let mut cleaned = drop_empty_rows(table);
        if request.remove_duplicates {
            cleaned = deduplicate(cleaned);
        }
        debug!(
            project_id = %project_id,
            rows_in = before,
            rows_out = cleaned.row_count(),
            "dataset cleaned"
        );

        let v1_path = match self.blobs.sibling(&raw_path, &cleaned_file_name(&raw_path)) {
            Ok(path) => path,
            Err(err) => return Err(undo.fail(self, DatasetError::partial("serialize v1", err))),
        };
        if let Err(err) = save(&cleaned, &v1_path) {
            return Err(undo.fail(self, DatasetError::partial("serialize v1", err)));
        }
        undo.push(Undo::RemoveBlob(v1_path.clone()));
        let v1_location = display(&v1_path);

        let description = if request.remove_duplicates {
            "Cleaned: empty and duplicate rows removed"
        } else {
            "Cleaned: empty rows removed"
        };
        let v1_id = match self
            .ledger
            .record(&project_id, description, &v1_location, VersionNumber::CLEANED)
        {
            Ok(id) => id,
            Err(err) => return Err(undo.fail(self, DatasetError::partial("record v1", err))),
        };
        undo.push(Undo::DeleteVersion(v1_id.clone()));

        let advance = ProjectAdvance {
            file_path: v1_location,
            version_number: VersionNumber::CLEANED,
            append_versions: vec![
                VersionRef::new(VersionNumber::RAW, v0_id.clone()),
                VersionRef::new(VersionNumber::CLEANED, v1_id.clone()),
            ],
        };
        if let Err(err) = self.projects.advance_project(&project_id, &advance) {
            return Err(undo.fail(self, DatasetError::partial("update project", err)));
        }

        info!(project_id = %project_id, version = "v1", "ingest complete");
        Ok(IngestOutcome {
            project_id,
            v0_id,
            v1_id,
        })
    }

    /// `Cleaned/Renamed -> Renamed`: applies `mapping` (old name to new
    /// name) and writes `{base_without_v1}_v2{ext}`. Blank targets and keys
    /// that match no column are ignored. On failure the project still points
    /// at its previous version.
    pub fn rename_columns(
        &self,
        project_id: &str,
        mapping: &HashMap<String, String>,
    ) -> Result<RenameOutcome, DatasetError> {
        let handle = self.locks.handle(project_id);
        let _guard = acquire(&handle);

        let project = self.require_project(project_id)?;
        if project.is_partitioned() {
            return Err(DatasetError::Validation(
                "project has been partitioned; columns can no longer be renamed".to_string(),
            ));
        }
        if !matches!(
            project.version_number,
            VersionNumber::CLEANED | VersionNumber::RENAMED
        ) {
            return Err(DatasetError::Validation(format!(
                "project is at version {} and cannot be renamed",
                project.version_number
            )));
        }

        let current = PathBuf::from(&project.file_path);
        let table = load(&current)?;
        let unmatched = unmatched_mapping_keys(&table, mapping);
        if !unmatched.is_empty() {
            warn!(project_id, columns = ?unmatched, "rename mapping names unknown columns; ignoring");
        }
        let renamed = rename_columns(table, mapping);

        let v2_path = self.blobs.sibling(&current, &renamed_file_name(&current))?;
        if v2_path.exists() {
            return Err(DatasetError::Validation(format!(
                "{} already exists and belongs to an earlier version",
                v2_path.display()
            )));
        }

        let mut undo = Compensation::new("rename");
        if let Err(err) = save(&renamed, &v2_path) {
            undo.push(Undo::RemoveBlob(v2_path));
            return Err(undo.fail(self, DatasetError::partial("serialize v2", err)));
        }
        undo.push(Undo::RemoveBlob(v2_path.clone()));
        let v2_location = display(&v2_path);

        let version_id = match self.ledger.record(
            project_id,
            "Columns renamed",
            &v2_location,
            VersionNumber::RENAMED,
        ) {
            Ok(id) => id,
            Err(err) => return Err(undo.fail(self, DatasetError::partial("record v2", err))),
        };
        undo.push(Undo::DeleteVersion(version_id.clone()));

        let advance = ProjectAdvance {
            file_path: v2_location.clone(),
            version_number: VersionNumber::RENAMED,
            append_versions: vec![VersionRef::new(VersionNumber::RENAMED, version_id.clone())],
        };
        if let Err(err) = self.projects.advance_project(project_id, &advance) {
            return Err(undo.fail(self, DatasetError::partial("update project", err)));
        }

        info!(project_id, version = "v2", "columns renamed");
        Ok(RenameOutcome {
            project_id: project_id.to_string(),
            version_id,
            file_path: v2_location,
            columns: renamed.columns().to_vec(),
            unmatched_columns: unmatched,
        })
    }

    /// `Renamed -> Partitioned`: writes one `{tag}_{tagType}_v2.{N}{ext}`
    /// file per `(tag, tag type)` group, numbered in sorted group order.
    /// Missing tag columns fail before anything is written.
    pub fn partition_by_tags(&self, project_id: &str) -> Result<PartitionOutcome, DatasetError> {
        let handle = self.locks.handle(project_id);
        let _guard = acquire(&handle);

        let project = self.require_project(project_id)?;
        if project.is_partitioned() {
            return Err(DatasetError::Validation(
                "project has already been partitioned".to_string(),
            ));
        }
        if project.version_number != VersionNumber::RENAMED {
            return Err(DatasetError::Validation(format!(
                "project is at version {}; rename its columns before partitioning",
                project.version_number
            )));
        }

        let current = PathBuf::from(&project.file_path);
        let extension = TableFormat::from_path(&current)?.extension();
        let columns = TagColumns::from_config(
            project.tag_column.as_deref(),
            project.tag_type_column.as_deref(),
        );
        let table = load(&current)?;
        let groups = partition_by_tag(&table, &columns)?;
        if groups.is_empty() {
            return Err(DatasetError::Validation(
                "dataset has no rows to partition".to_string(),
            ));
        }

        // Every target is checked before anything is written so no earlier
        // version's file can be replaced.
        let recorded: HashSet<PathBuf> = self
            .ledger
            .list_versions(project_id)?
            .into_iter()
            .map(|v| PathBuf::from(v.file_path))
            .collect();
        let mut targets = Vec::with_capacity(groups.len());
        for (i, group) in groups.iter().enumerate() {
            let index = i + 1;
            let file_name = partition_file_name(&group.tag, &group.tag_type, index, extension)
                .ok_or_else(|| {
                    DatasetError::Validation(format!(
                        "tag '{}' / '{}' gives no usable file name",
                        group.tag, group.tag_type
                    ))
                })?;
            let path = self.blobs.sibling(&current, &file_name)?;
            if path.exists() || recorded.contains(&path) {
                return Err(DatasetError::Validation(format!(
                    "{} already exists and belongs to an earlier version",
                    path.display()
                )));
            }
            targets.push((index, path));
        }

        let mut partitions: Vec<TagPartition> = Vec::with_capacity(groups.len());
        for (group, (index, path)) in groups.iter().zip(targets) {
            if let Err(err) = save(&group.table, &path) {
                report_orphans(project_id, &partitions);
                return Err(DatasetError::PartialFailure {
                    step: "serialize partition",
                    reason: format!("v2.{index}: {err}"),
                });
            }

            let location = display(&path);
            let version_number = VersionNumber::partition_of_renamed(index as u32);
            let description = format!("Partition: tag {} / tag type {}", group.tag, group.tag_type);
            let version_id =
                match self
                    .ledger
                    .record(project_id, &description, &location, version_number)
                {
                    Ok(id) => id,
                    Err(err) => {
                        report_orphans(project_id, &partitions);
                        warn!(project_id, path = %location, "partition file left without a ledger entry");
                        return Err(DatasetError::PartialFailure {
                            step: "record partition",
                            reason: format!("v2.{index}: {err}"),
                        });
                    }
                };
            debug!(project_id, version = %version_number, rows = group.table.row_count(), "partition written");
            partitions.push(TagPartition {
                version_id,
                tag: group.tag.clone(),
                tag_type: group.tag_type.clone(),
                file_path: location,
                version_number,
            });
        }

        if let Err(err) = self
            .projects
            .mark_partitioned(project_id, &partitions, VersionNumber::RENAMED)
        {
            report_orphans(project_id, &partitions);
            return Err(DatasetError::partial("update project", err));
        }

        info!(project_id, partitions = partitions.len(), "project partitioned");
        Ok(PartitionOutcome {
            project_id: project_id.to_string(),
            partitions,
        })
    }

    /// Replaces the datatype mapping and tag column configuration.
    pub fn update_project(
        &self,
        project_id: &str,
        settings: &ProjectSettings,
    ) -> Result<Project, DatasetError> {
        if let Some(blank) = settings
            .datatype_mapping
            .iter()
            .find(|m| m.column_name.trim().is_empty())
        {
            return Err(DatasetError::Validation(format!(
                "datatype mapping entry has an empty column name (datatype {:?})",
                blank.datatype
            )));
        }

        let handle = self.locks.handle(project_id);
        let _guard = acquire(&handle);
        self.require_project(project_id)?;
        self.projects.update_settings(project_id, settings)?;
        info!(project_id, columns = settings.datatype_mapping.len(), "project settings updated");
        self.require_project(project_id)
    }

    /// Removes every file the project owns, its ledger entries, then the
    /// project record. Files are removed first so a failure leaves the
    /// project in place for a retry.
    pub fn delete_project(&self, project_id: &str) -> Result<(), DatasetError> {
        let handle = self.locks.handle(project_id);
        let guard = acquire(&handle);

        let project = self.require_project(project_id)?;
        let versions = self.ledger.list_versions(project_id)?;

        for version in &versions {
            if let Err(err) = self.blobs.delete(Path::new(&version.file_path)) {
                warn!(project_id, path = %version.file_path, error = %err, "could not remove version file");
            }
        }
        self.blobs.delete_project_dir(&project.name)?;

        for version in &versions {
            self.ledger.delete_version(&version.version_id)?;
        }
        self.projects.delete_project(project_id)?;

        drop(guard);
        self.locks.forget(project_id);
        info!(project_id, versions = versions.len(), "project deleted");
        Ok(())
    }

    pub fn get_project(&self, project_id: &str) -> Result<Project, DatasetError> {
        self.require_project(project_id)
    }

    pub fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, DatasetError> {
        let user_id = required(user_id, "user_id")?;
        Ok(self.projects.list_projects(user_id)?)
    }

    /// Column names plus the first [`PREVIEW_ROWS`] rows.
    pub fn project_data(&self, project_id: &str) -> Result<TablePreview, DatasetError> {
        let (_, location) = self.data_location(project_id)?;
        Ok(load(&location)?.preview(PREVIEW_ROWS))
    }

    pub fn column_names(&self, project_id: &str) -> Result<Vec<String>, DatasetError> {
        let (_, location) = self.data_location(project_id)?;
        Ok(load_header_only(&location)?)
    }

    pub fn tag_summary(&self, project_id: &str) -> Result<Vec<TagSummary>, DatasetError> {
        let (project, location) = self.data_location(project_id)?;
        let columns = TagColumns::from_config(
            project.tag_column.as_deref(),
            project.tag_type_column.as_deref(),
        );
        Ok(summarize_tags(&load(&location)?, &columns)?)
    }

    pub fn versions(&self, project_id: &str) -> Result<Vec<VersionRecord>, DatasetError> {
        self.require_project(project_id)?;
        Ok(self.ledger.list_versions(project_id)?)
    }

    /// Reads a stored file by its location, which may be absolute or
    /// relative to the store root.
    pub fn download(&self, file_path: &str) -> Result<DownloadedFile, DatasetError> {
        let file_path = required(file_path, "file_path")?;
        let path = self.blobs.resolve(Path::new(file_path))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let bytes = self.blobs.read(&path)?;
        Ok(DownloadedFile { file_name, bytes })
    }

    fn require_project(&self, project_id: &str) -> Result<Project, DatasetError> {
        self.projects
            .get_project(project_id)?
            .ok_or_else(|| DatasetError::NotFound(format!("project not found: {project_id}")))
    }

    /// File holding the project's current whole-dataset table. Partitioned
    /// projects resolve to the last whole version in their log.
    fn data_location(&self, project_id: &str) -> Result<(Project, PathBuf), DatasetError> {
        let project = self.require_project(project_id)?;
        if !project.is_partitioned() {
            let location = self.blobs.resolve(Path::new(&project.file_path))?;
            return Ok((project, location));
        }

        let version_id = project.latest_whole_version_id().ok_or_else(|| {
            DatasetError::NotFound(format!("project {project_id} has no whole-dataset version"))
        })?;
        let version = self
            .ledger
            .get_version(version_id)?
            .ok_or_else(|| DatasetError::NotFound(format!("version not found: {version_id}")))?;
        let location = self.blobs.resolve(Path::new(&version.file_path))?;
        Ok((project, location))
    }
}

/// One compensating action, run in reverse push order.
#[derive(Debug, Clone)]
enum Undo {
    RemoveBlob(PathBuf),
    RemoveProjectDir(String),
    DeleteVersion(String),
    DeleteProject(String),
}

/// Compensating actions for the steps an operation has completed so far.
/// Every action tolerates its target already being gone.
struct Compensation {
    operation: &'static str,
    steps: Vec<Undo>,
}

impl Compensation {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
        }
    }

    fn push(&mut self, step: Undo) {
        self.steps.push(step);
    }

    /// Runs every compensation and hands back `error` for the caller.
    fn fail(self, lifecycle: &ProjectLifecycle<'_>, error: DatasetError) -> DatasetError {
        warn!(operation = self.operation, error = %error, "rolling back");
        for step in self.steps.into_iter().rev() {
            let result = match &step {
                Undo::RemoveBlob(path) => lifecycle.blobs.delete(path).map_err(|e| e.to_string()),
                Undo::RemoveProjectDir(name) => lifecycle
                    .blobs
                    .delete_project_dir(name)
                    .map_err(|e| e.to_string()),
                Undo::DeleteVersion(id) => lifecycle
                    .ledger
                    .delete_version(id)
                    .map(drop)
                    .map_err(|e| e.to_string()),
                Undo::DeleteProject(id) => lifecycle
                    .projects
                    .delete_project(id)
                    .map(drop)
                    .map_err(|e| e.to_string()),
            };
            match result {
                Ok(()) => debug!(operation = self.operation, step = ?step, "compensated"),
                Err(reason) => {
                    warn!(operation = self.operation, step = ?step, reason, "compensation failed")
                }
            }
        }
        error
    }
}

fn report_orphans(project_id: &str, written: &[TagPartition]) {
    for partition in written {
        warn!(
            project_id,
            version_id = %partition.version_id,
            path = %partition.file_path,
            "partition left without a project reference"
        );
    }
}

fn required<'s>(value: &'s str, field: &str) -> Result<&'s str, DatasetError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatasetError::Validation(format!("missing required field: {field}")));
    }
    Ok(trimmed)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// `{base}_v1{ext}`.
fn cleaned_file_name(raw: &Path) -> String {
    let (stem, ext) = split_name(raw);
    format!("{stem}_v1{ext}")
}

/// `{base_without_v1}_v2{ext}`.
fn renamed_file_name(current: &Path) -> String {
    let (stem, ext) = split_name(current);
    let base = stem.strip_suffix("_v1").unwrap_or(&stem);
    format!("{base}_v2{ext}")
}

#[cfg(test)]
mod tests {
    use super::{cleaned_file_name, renamed_file_name, required};
    use std::path::Path;

    #[test]
    fn derived_file_names_follow_version_convention() {
        assert_eq!(cleaned_file_name(Path::new("/d/p/sales.csv")), "sales_v1.csv");
        assert_eq!(renamed_file_name(Path::new("/d/p/sales_v1.csv")), "sales_v2.csv");
        assert_eq!(renamed_file_name(Path::new("/d/p/book_v1.xlsx")), "book_v2.xlsx");
        assert_eq!(renamed_file_name(Path::new("/d/p/sales_v2.csv")), "sales_v2_v2.csv");
    }

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(required("  p ", "name").ok(), Some("p"));
        assert!(required("   ", "name").is_err());
    }
}
