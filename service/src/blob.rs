//! Per-project file storage on the local filesystem.
//!
//! Every project owns one directory under the store root, named after the
//! sanitized project name. Locations handed out are absolute paths inside
//! that root.

use dataset_core::sanitize_file_name;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("a project named '{0}' already exists; choose a different project name")]
    NameCollision(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid file or project name: {0:?}")]
    InvalidName(String),
    #[error("path is outside the dataset root: {0}")]
    OutsideRoot(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BlobError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Opens (creating if needed) the store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, BlobError> {
        fs::create_dir_all(root).map_err(|e| BlobError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| BlobError::io(root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project_name: &str) -> Result<PathBuf, BlobError> {
        Ok(self.root.join(sanitize_filename(project_name)?))
    }

    /// Stores the first upload of a new project. Fails with
    /// [`BlobError::NameCollision`] if the project's directory already exists.
    pub fn put_new_project(
        &self,
        project_name: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, BlobError> {
        let dir = self.project_dir(project_name)?;
        let file_name = sanitize_filename(filename)?;

        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobError::NameCollision(project_name.to_string()));
            }
            Err(e) => return Err(BlobError::io(&dir, e)),
        }

        let path = dir.join(file_name);
        if let Err(e) = fs::write(&path, bytes) {
            let _ = fs::remove_dir_all(&dir);
            return Err(BlobError::io(&path, e));
        }
        Ok(path)
    }

    /// Location for a derived file stored next to `existing`.
    pub fn sibling(&self, existing: &Path, filename: &str) -> Result<PathBuf, BlobError> {
        let existing = self.resolve(existing)?;
        let dir = existing
            .parent()
            .ok_or_else(|| BlobError::OutsideRoot(existing.display().to_string()))?;
        Ok(dir.join(sanitize_filename(filename)?))
    }

    pub fn read(&self, location: &Path) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(location)?;
        fs::read(&path).map_err(|e| BlobError::io(&path, e))
    }

    /// Removes a stored file. Removing a file that is already gone succeeds.
    pub fn delete(&self, location: &Path) -> Result<(), BlobError> {
        let path = match self.resolve(location) {
            Ok(path) => path,
            Err(BlobError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::io(&path, e)),
        }
    }

    /// Removes a project's directory and everything in it.
    pub fn delete_project_dir(&self, project_name: &str) -> Result<(), BlobError> {
        let dir = self.project_dir(project_name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::io(&dir, e)),
        }
    }

    /// Resolves a caller-supplied location (absolute, or relative to the
    /// root) to an existing file inside the root.
    pub fn resolve(&self, location: &Path) -> Result<PathBuf, BlobError> {
        if location
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(BlobError::OutsideRoot(location.display().to_string()));
        }

        let candidates = if location.is_absolute() {
            vec![location.to_path_buf()]
        } else {
            vec![self.root.join(location), Path::new("/").join(location)]
        };

        for candidate in candidates {
            match candidate.canonicalize() {
                Ok(real) if real.starts_with(&self.root) => return Ok(real),
                Ok(_) => return Err(BlobError::OutsideRoot(location.display().to_string())),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(BlobError::io(&candidate, e)),
            }
        }
        Err(BlobError::NotFound(location.display().to_string()))
    }
}

/// [`sanitize_file_name`], failing with [`BlobError::InvalidName`] when
/// nothing usable is left.
pub fn sanitize_filename(name: &str) -> Result<String, BlobError> {
    sanitize_file_name(name).ok_or_else(|| BlobError::InvalidName(name.to_string()))
}
