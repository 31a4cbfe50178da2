//! Dataset service: project storage, version ledger and the project
//! lifecycle behind an HTTP API.
//!
//! The dependency graph is built once in [`AppState::new`] and shared with
//! every request handler.

pub mod blob;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod model;
pub mod routes;
pub mod store;

use std::sync::Arc;

pub use blob::{BlobError, BlobStore};
pub use config::{ConfigError, ServiceConfig};
pub use error::DatasetError;
pub use lifecycle::{
    DownloadedFile, IngestOutcome, PartitionOutcome, ProjectLifecycle, RenameOutcome,
    UploadRequest,
};
pub use locks::ProjectLocks;
pub use store::{Catalog, ProjectStore, StoreError, VersionLedger};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog: {0}")]
    Store(#[from] StoreError),
    #[error("dataset root: {0}")]
    Blob(#[from] BlobError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub catalog: Catalog,
    pub blobs: BlobStore,
    pub locks: ProjectLocks,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        let catalog = Catalog::open(&config.db_path)?;
        let blobs = BlobStore::open(&config.dataset_root)?;
        Ok(Self::from_parts(config, catalog, blobs))
    }

    pub fn from_parts(config: ServiceConfig, catalog: Catalog, blobs: BlobStore) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            blobs,
            locks: ProjectLocks::new(),
        }
    }

    pub fn lifecycle(&self) -> ProjectLifecycle<'_> {
        ProjectLifecycle::new(&self.blobs, &self.catalog, &self.catalog, &self.locks)
    }
}
