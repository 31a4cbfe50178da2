//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use dataset_service::lifecycle::{IngestOutcome, ProjectLifecycle, UploadRequest};
use dataset_service::model::{VersionNumber, VersionRecord};
use dataset_service::{BlobStore, Catalog, DatasetError, ProjectLocks, StoreError, VersionLedger};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    pub path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before epoch")
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("dataset-service-{prefix}-{stamp}-{seq}"));
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A blob store in a temp dir plus an in-memory catalog.
pub struct Harness {
    pub temp: TempDir,
    pub catalog: Catalog,
    pub blobs: BlobStore,
    pub locks: ProjectLocks,
}

impl Harness {
    pub fn new(prefix: &str) -> Self {
        let temp = TempDir::new(prefix);
        let blobs = BlobStore::open(&temp.path.join("datasets")).expect("open blob store");
        let catalog = Catalog::open_in_memory().expect("open catalog");
        Self {
            temp,
            catalog,
            blobs,
            locks: ProjectLocks::new(),
        }
    }

    pub fn lifecycle(&self) -> ProjectLifecycle<'_> {
        ProjectLifecycle::new(&self.blobs, &self.catalog, &self.catalog, &self.locks)
    }

    pub fn with_ledger<'a>(&'a self, ledger: &'a dyn VersionLedger) -> ProjectLifecycle<'a> {
        ProjectLifecycle::new(&self.blobs, &self.catalog, ledger, &self.locks)
    }

    pub fn upload(
        &self,
        name: &str,
        filename: &str,
        contents: &str,
        remove_duplicates: bool,
    ) -> Result<IngestOutcome, DatasetError> {
        self.lifecycle().ingest(request(name, filename, contents, remove_duplicates))
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.blobs.root().join(name)
    }
}

pub fn request(name: &str, filename: &str, contents: &str, remove_duplicates: bool) -> UploadRequest {
    UploadRequest {
        name: name.to_string(),
        user_id: "user-1".to_string(),
        filename: filename.to_string(),
        bytes: contents.as_bytes().to_vec(),
        remove_duplicates,
    }
}

/// Delegates to a [`Catalog`] but refuses to record versions whose number
/// matches `fail_on` while armed.
pub struct FailingLedger {
    pub inner: Catalog,
    pub fail_on: VersionNumber,
    pub armed: AtomicBool,
}

impl FailingLedger {
    pub fn new(inner: Catalog, fail_on: VersionNumber) -> Self {
        Self {
            inner,
            fail_on,
            armed: AtomicBool::new(true),
        }
    }
}

impl VersionLedger for FailingLedger {
    fn record(
        &self,
        project_id: &str,
        description: &str,
        file_path: &str,
        version_number: VersionNumber,
    ) -> Result<String, StoreError> {
        if self.armed.load(Ordering::SeqCst) && version_number == self.fail_on {
            return Err(StoreError::InvalidData(format!(
                "injected failure recording {version_number}"
            )));
        }
        self.inner
            .record(project_id, description, file_path, version_number)
    }

    fn get_version(&self, version_id: &str) -> Result<Option<VersionRecord>, StoreError> {
        self.inner.get_version(version_id)
    }

    fn list_versions(&self, project_id: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.inner.list_versions(project_id)
    }

    fn update_file_location(&self, version_id: &str, file_path: &str) -> Result<bool, StoreError> {
        self.inner.update_file_location(version_id, file_path)
    }

    fn delete_version(&self, version_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_version(version_id)
    }
}

pub fn read_to_string(path: &str) -> String {
    fs::read_to_string(path).expect("read stored file")
}
