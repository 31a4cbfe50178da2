use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer for {0}")]
    InvalidInteger(&'static str),
    #[error("invalid bind address {addr:?}: {reason}")]
    InvalidBind { addr: String, reason: String },
    #[error("invalid CORS origin {0:?}")]
    InvalidCorsOrigin(String),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub dataset_root: PathBuf,
    pub cors_origin: String,
    pub max_upload_mb: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            db_path: PathBuf::from("data/datasets.sqlite"),
            dataset_root: PathBuf::from("datasets"),
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_mb: 64,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env_or("DATASET_BIND", &defaults.bind_addr),
            db_path: PathBuf::from(env_or("DATASET_DB_PATH", "data/datasets.sqlite")),
            dataset_root: PathBuf::from(env_or("DATASET_ROOT", "datasets")),
            cors_origin: env_or("DATASET_CORS_ORIGIN", &defaults.cors_origin),
            max_upload_mb: env_or_int("DATASET_MAX_UPLOAD_MB", defaults.max_upload_mb)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidBind {
                addr: self.bind_addr.clone(),
                reason: err.to_string(),
            })
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_int(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidInteger(key)),
        Err(_) => Ok(default),
    }
}
