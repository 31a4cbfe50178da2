use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::{ProjectAdvance, ProjectStore, StoreError, VersionLedger};
use crate::model::{
    NewProject, PARTITIONED_FILE_PATH, Project, ProjectSettings, TagPartition, VersionNumber,
    VersionRecord, VersionRef,
};

const SCHEMA_VERSION: i64 = 1;

const PROJECT_COLUMNS: &str = "project_id, user_id, name, file_path, version_number, \
     datatype_mapping_json, versions_json, sub_versions_json, remove_duplicates, \
     tag_column, tag_type_column, created_at, updated_at";

const VERSION_COLUMNS: &str =
    "version_id, project_id, description, file_path, version_number, created_at";

/// SQLite-backed project store and version ledger sharing one connection.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn load_project(conn: &Connection, project_id: &str) -> Result<Option<Project>, StoreError> {
        let raw = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
                params![project_id],
                RawProject::from_row,
            )
            .optional()?;
        raw.map(RawProject::into_project).transpose()
    }

    fn load_versions_log(conn: &Connection, project_id: &str) -> Result<Vec<VersionRef>, StoreError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT versions_json FROM projects WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| StoreError::MissingProject(project_id.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl ProjectStore for Catalog {
    fn create_project(&self, new: &NewProject) -> Result<Project, StoreError> {
        let now = now_iso();
        let project = Project {
            project_id: Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            name: new.name.clone(),
            file_path: new.file_path.clone(),
            version_number: VersionNumber::RAW,
            datatype_mapping: Vec::new(),
            versions: Vec::new(),
            sub_versions: None,
            remove_duplicates: new.remove_duplicates,
            tag_column: None,
            tag_type_column: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO projects ({PROJECT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
            params![
                project.project_id,
                project.user_id,
                project.name,
                project.file_path,
                project.version_number.to_string(),
                "[]",
                "[]",
                Option::<String>::None,
                project.remove_duplicates,
                project.tag_column,
                project.tag_type_column,
                project.created_at,
                project.updated_at,
            ],
        )?;
        Ok(project)
    }

    fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        let conn = self.lock()?;
        Self::load_project(&conn, project_id)
    }

    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt.query_map(params![user_id], RawProject::from_row)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?.into_project()?);
        }
        Ok(projects)
    }

    fn advance_project(&self, project_id: &str, advance: &ProjectAdvance) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut log = Self::load_versions_log(&tx, project_id)?;
        log.extend(advance.append_versions.iter().cloned());

        tx.execute(
            "UPDATE projects SET file_path = ?1, version_number = ?2, versions_json = ?3, updated_at = ?4 \
             WHERE project_id = ?5",
            params![
                advance.file_path,
                advance.version_number.to_string(),
                serde_json::to_string(&log)?,
                now_iso(),
                project_id,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn mark_partitioned(
        &self,
        project_id: &str,
        partitions: &[TagPartition],
        version_number: VersionNumber,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut log = Self::load_versions_log(&tx, project_id)?;
        log.extend(
            partitions
                .iter()
                .map(|p| VersionRef::new(p.version_number, p.version_id.clone())),
        );

        tx.execute(
            "UPDATE projects SET file_path = ?1, version_number = ?2, versions_json = ?3, \
             sub_versions_json = ?4, updated_at = ?5 WHERE project_id = ?6",
            params![
                PARTITIONED_FILE_PATH,
                version_number.to_string(),
                serde_json::to_string(&log)?,
                serde_json::to_string(partitions)?,
                now_iso(),
                project_id,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_settings(&self, project_id: &str, settings: &ProjectSettings) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE projects SET datatype_mapping_json = ?1, tag_column = ?2, tag_type_column = ?3, \
             updated_at = ?4 WHERE project_id = ?5",
            params![
                serde_json::to_string(&settings.datatype_mapping)?,
                settings.tag_column,
                settings.tag_type_column,
                now_iso(),
                project_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingProject(project_id.to_string()));
        }
        Ok(())
    }

    fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM versions WHERE project_id = ?1", params![project_id])?;
        let removed = tx.execute("DELETE FROM projects WHERE project_id = ?1", params![project_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

impl VersionLedger for Catalog {
    fn record(
        &self,
        project_id: &str,
        description: &str,
        file_path: &str,
        version_number: VersionNumber,
    ) -> Result<String, StoreError> {
        let version_id = Uuid::new_v4().to_string();
        let now = now_iso();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO versions (version_id, project_id, description, file_path, version_number, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                version_id,
                project_id,
                description,
                file_path,
                version_number.to_string(),
                now,
                now,
            ],
        )?;
        Ok(version_id)
    }

    fn get_version(&self, version_id: &str) -> Result<Option<VersionRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE version_id = ?1"),
                params![version_id],
                RawVersion::from_row,
            )
            .optional()?;
        raw.map(RawVersion::into_record).transpose()
    }

    fn list_versions(&self, project_id: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE project_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![project_id], RawVersion::from_row)?;
        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?.into_record()?);
        }
        Ok(versions)
    }

    fn update_file_location(&self, version_id: &str, file_path: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE versions SET file_path = ?1, updated_at = ?2 WHERE version_id = ?3",
            params![file_path, now_iso(), version_id],
        )?;
        Ok(changed > 0)
    }

    fn delete_version(&self, version_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM versions WHERE version_id = ?1", params![version_id])?;
        Ok(removed > 0)
    }
}

struct RawProject {
    project_id: String,
    user_id: String,
    name: String,
    file_path: String,
    version_number: String,
    datatype_mapping_json: String,
    versions_json: String,
    sub_versions_json: Option<String>,
    remove_duplicates: bool,
    tag_column: Option<String>,
    tag_type_column: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawProject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            project_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            file_path: row.get(3)?,
            version_number: row.get(4)?,
            datatype_mapping_json: row.get(5)?,
            versions_json: row.get(6)?,
            sub_versions_json: row.get(7)?,
            remove_duplicates: row.get(8)?,
            tag_column: row.get(9)?,
            tag_type_column: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_project(self) -> Result<Project, StoreError> {
        Ok(Project {
            version_number: parse_version(&self.version_number)?,
            datatype_mapping: serde_json::from_str(&self.datatype_mapping_json)?,
            versions: serde_json::from_str(&self.versions_json)?,
            sub_versions: self
                .sub_versions_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            project_id: self.project_id,
            user_id: self.user_id,
            name: self.name,
            file_path: self.file_path,
            remove_duplicates: self.remove_duplicates,
            tag_column: self.tag_column,
            tag_type_column: self.tag_type_column,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct RawVersion {
    version_id: String,
    project_id: String,
    description: String,
    file_path: String,
    version_number: String,
    created_at: String,
}

impl RawVersion {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version_id: row.get(0)?,
            project_id: row.get(1)?,
            description: row.get(2)?,
            file_path: row.get(3)?,
            version_number: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<VersionRecord, StoreError> {
        Ok(VersionRecord {
            version_number: parse_version(&self.version_number)?,
            version_id: self.version_id,
            project_id: self.project_id,
            description: self.description,
            file_path: self.file_path,
            created_at: self.created_at,
        })
    }
}

fn parse_version(raw: &str) -> Result<VersionNumber, StoreError> {
    raw.parse()
        .map_err(|e: crate::model::InvalidVersionNumber| StoreError::InvalidData(e.to_string()))
}

fn now_iso() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}

#[cfg(test)]
mod tests {
    use super::Catalog;
    use crate::model::{NewProject, PARTITIONED_FILE_PATH, ProjectSettings, TagPartition, VersionNumber, VersionRef};
    use crate::store::{ProjectAdvance, ProjectStore, StoreError, VersionLedger};

    fn new_project(catalog: &Catalog, user: &str, name: &str) -> String {
        catalog
            .create_project(&NewProject {
                user_id: user.to_string(),
                name: name.to_string(),
                file_path: format!("/data/{name}/raw.csv"),
                remove_duplicates: true,
            })
            .expect("create project")
            .project_id
    }

    #[test]
    fn project_round_trips_through_sqlite() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let id = new_project(&catalog, "u1", "sales");
        let project = catalog.get_project(&id).expect("get").expect("exists");
        assert_eq!(project.name, "sales");
        assert_eq!(project.version_number, VersionNumber::RAW);
        assert!(project.remove_duplicates);
        assert!(project.versions.is_empty());
        assert!(!project.is_partitioned());
        assert!(catalog.get_project("nope").expect("get").is_none());
    }

    #[test]
    fn advance_appends_to_version_log() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let id = new_project(&catalog, "u1", "sales");
        let v0 = catalog
            .record(&id, "raw", "/data/sales/raw.csv", VersionNumber::RAW)
            .expect("record v0");
        let v1 = catalog
            .record(&id, "clean", "/data/sales/raw_v1.csv", VersionNumber::CLEANED)
            .expect("record v1");
        catalog
            .advance_project(
                &id,
                &ProjectAdvance {
                    file_path: "/data/sales/raw_v1.csv".into(),
                    version_number: VersionNumber::CLEANED,
                    append_versions: vec![
                        VersionRef::new(VersionNumber::RAW, v0.clone()),
                        VersionRef::new(VersionNumber::CLEANED, v1.clone()),
                    ],
                },
            )
            .expect("advance");

        let project = catalog.get_project(&id).expect("get").expect("exists");
        assert_eq!(project.file_path, "/data/sales/raw_v1.csv");
        assert_eq!(project.version_number, VersionNumber::CLEANED);
        assert_eq!(project.versions.len(), 2);
        assert_eq!(project.latest_whole_version_id(), Some(v1.as_str()));

        let listed: Vec<String> = catalog
            .list_versions(&id)
            .expect("list")
            .into_iter()
            .map(|v| v.version_id)
            .collect();
        assert_eq!(listed, vec![v0, v1]);
    }

    #[test]
    fn mark_partitioned_sets_sentinel_and_descriptors() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let id = new_project(&catalog, "u1", "tags");
        let part = catalog
            .record(&id, "A/X", "/data/tags/A_X_v2.1.csv", VersionNumber::partition_of_renamed(1))
            .expect("record partition");
        let partitions = vec![TagPartition {
            version_id: part.clone(),
            tag: "A".into(),
            tag_type: "X".into(),
            file_path: "/data/tags/A_X_v2.1.csv".into(),
            version_number: VersionNumber::partition_of_renamed(1),
        }];
        catalog
            .mark_partitioned(&id, &partitions, VersionNumber::RENAMED)
            .expect("mark partitioned");

        let project = catalog.get_project(&id).expect("get").expect("exists");
        assert_eq!(project.file_path, PARTITIONED_FILE_PATH);
        assert_eq!(project.version_number, VersionNumber::RENAMED);
        assert_eq!(project.sub_versions.as_deref(), Some(partitions.as_slice()));
        assert_eq!(project.versions.last().map(|r| r.label.as_str()), Some("v2.1"));
    }

    #[test]
    fn settings_update_requires_existing_project() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let err = catalog
            .update_settings("missing", &ProjectSettings::default())
            .expect_err("no such project");
        assert!(matches!(err, StoreError::MissingProject(_)));
    }

    #[test]
    fn ledger_rejects_entries_for_unknown_projects() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        assert!(catalog.record("ghost", "raw", "/x.csv", VersionNumber::RAW).is_err());
    }

    #[test]
    fn delete_project_cascades_to_versions_and_list_filters_by_user() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let a = new_project(&catalog, "u1", "a");
        let _b = new_project(&catalog, "u1", "b");
        let _c = new_project(&catalog, "u2", "c");
        let v = catalog.record(&a, "raw", "/a.csv", VersionNumber::RAW).expect("record");

        assert_eq!(catalog.list_projects("u1").expect("list").len(), 2);
        assert!(catalog.delete_project(&a).expect("delete"));
        assert!(!catalog.delete_project(&a).expect("delete again"));
        assert!(catalog.get_version(&v).expect("get version").is_none());
        assert_eq!(catalog.list_projects("u1").expect("list").len(), 1);
    }

    #[test]
    fn file_location_patch_touches_only_that_entry() {
        let catalog = Catalog::open_in_memory().expect("open catalog");
        let id = new_project(&catalog, "u1", "p");
        let v = catalog.record(&id, "raw", "/old.csv", VersionNumber::RAW).expect("record");
        assert!(catalog.update_file_location(&v, "/new.csv").expect("patch"));
        let record = catalog.get_version(&v).expect("get").expect("exists");
        assert_eq!(record.file_path, "/new.csv");
        assert!(!catalog.update_file_location("missing", "/x.csv").expect("patch"));
    }
}
