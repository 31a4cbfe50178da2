//! ZIP package access for `.xlsx` files.
//!
//! Parts are read whole, but each part and the running total are capped so
//! a compressed upload cannot inflate into unbounded memory.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error_codes;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

#[derive(Debug, Clone, Copy)]
pub(crate) struct ContainerLimits {
    pub(crate) max_part_bytes: u64,
    pub(crate) max_total_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: 256 * 1024 * 1024,
            max_total_bytes: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a ZIP container")]
    NotZipContainer,
    #[error("not an OPC package (missing [Content_Types].xml)")]
    NotOpcPackage,
    #[error("part '{path}' is too large: {size} bytes (limit: {limit} bytes)")]
    PartTooLarge { path: String, size: u64, limit: u64 },
    #[error("workbook expands past {limit} bytes")]
    TotalTooLarge { limit: u64 },
    #[error("failed to read ZIP entry '{path}': {reason}")]
    ZipRead { path: String, reason: String },
    #[error("file not found in archive: {path}")]
    FileNotFound { path: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::NotOpcPackage => error_codes::CONTAINER_NOT_OPC,
            ContainerError::PartTooLarge { .. } => error_codes::CONTAINER_PART_TOO_LARGE,
            ContainerError::TotalTooLarge { .. } => error_codes::CONTAINER_TOTAL_TOO_LARGE,
            ContainerError::ZipRead { .. } | ContainerError::FileNotFound { .. } => {
                error_codes::CONTAINER_ZIP
            }
        }
    }

    fn zip_read(path: &str, reason: impl ToString) -> Self {
        ContainerError::ZipRead {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub(crate) struct XlsxContainer<R: Read + Seek = File> {
    archive: ZipArchive<R>,
    limits: ContainerLimits,
    total_read: u64,
}

impl XlsxContainer {
    pub(crate) fn open(path: &Path) -> Result<Self, ContainerError> {
        Self::with_limits(File::open(path)?, ContainerLimits::default())
    }
}

impl<R: Read + Seek> XlsxContainer<R> {
    pub(crate) fn with_limits(reader: R, limits: ContainerLimits) -> Result<Self, ContainerError> {
        let archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::Io(e) => ContainerError::Io(e),
            _ => ContainerError::NotZipContainer,
        })?;
        if !archive.file_names().any(|n| n == CONTENT_TYPES_PART) {
            return Err(ContainerError::NotOpcPackage);
        }
        Ok(Self {
            archive,
            limits,
            total_read: 0,
        })
    }

    pub(crate) fn read_part(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let mut entry = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ContainerError::FileNotFound {
                path: name.to_string(),
            },
            other => ContainerError::zip_read(name, other),
        })?;

        let size = entry.size();
        if size > self.limits.max_part_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size,
                limit: self.limits.max_part_bytes,
            });
        }
        let total = self.total_read.saturating_add(size);
        if total > self.limits.max_total_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: self.limits.max_total_bytes,
            });
        }

        let mut buf = Vec::with_capacity(size as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| ContainerError::zip_read(name, e))?;
        self.total_read = total;
        Ok(buf)
    }

    pub(crate) fn read_part_optional(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ContainerError> {
        match self.read_part(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(ContainerError::FileNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
