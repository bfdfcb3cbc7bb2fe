//! Object storage for applicant documents
//!
//! The services only see [`DocumentStorage`]; the backend is picked from
//! configuration. Key layout and upload validation live in [`paths`].

pub mod memory;
pub mod paths;
pub mod s3;

use std::sync::Arc;
use async_trait::async_trait;
use crate::config::StorageConfig;
use crate::utils::errors::{ScholarDeskError, Result, StorageResult};

pub use memory::MemoryStorage;
pub use paths::DocumentPolicy;
pub use s3::{RetryPolicy, S3Storage};

/// Minimal object store contract used for uploaded documents
#[async_trait]
pub trait DocumentStorage: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Deleting a missing key succeeds
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Address clients can use to fetch the object
    fn url(&self, key: &str) -> String;
}

/// Build the configured storage backend
pub fn storage_from_config(config: &StorageConfig) -> Result<Arc<dyn DocumentStorage>> {
    match config.backend.as_str() {
        "s3" => Ok(Arc::new(S3Storage::from_config(config)?)),
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        other => Err(ScholarDeskError::Config(format!("Unknown storage backend: {}", other))),
    }
}
