//! In-process object store

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use super::DocumentStorage;
use crate::utils::errors::{StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Keeps objects in memory; used by tests and local runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject { bytes, content_type: content_type.to_string() },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    fn url(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
