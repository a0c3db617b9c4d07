//! In-memory object store for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::paths::{require_canonical, require_staged};
use crate::store::ObjectStore;

/// Map-backed [`ObjectStore`]. Replace is a map swap under the write
/// lock, which gives the same reader-visible atomicity as the S3 impl.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a canonical object directly (test setup).
    pub async fn put_canonical(&self, key: &str, bytes: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), bytes);
    }

    /// Snapshot of all keys and contents (test assertions).
    pub async fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.objects.read().await.clone()
    }

    /// Whether a key exists.
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Keys under the staging prefix.
    pub async fn staged_keys(&self) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|k| crate::paths::is_staged(k))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn stage_put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        require_staged(key)?;
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn canonical_replace(&self, staged_key: &str, canonical_key: &str) -> StorageResult<()> {
        require_staged(staged_key)?;
        require_canonical(canonical_key)?;

        let mut objects = self.objects.write().await;
        let bytes = objects
            .get(staged_key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(staged_key))?;
        objects.insert(canonical_key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn delete_staged(&self, key: &str) -> StorageResult<()> {
        require_staged(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn resolve_url(&self, key: &str, _expiry: Duration) -> StorageResult<String> {
        require_canonical(key)?;
        Ok(format!("memory://{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_staged_invisible_until_replace() {
        let store = MemoryStore::new();
        store.put_canonical("campaigns/c/scenes/0.mp4", b"old".to_vec()).await;

        store
            .stage_put("staging/j/scene.mp4", b"new".to_vec())
            .await
            .unwrap();
        assert_eq!(store.get("campaigns/c/scenes/0.mp4").await.unwrap(), b"old");

        store
            .canonical_replace("staging/j/scene.mp4", "campaigns/c/scenes/0.mp4")
            .await
            .unwrap();
        assert_eq!(store.get("campaigns/c/scenes/0.mp4").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_delete_staged_is_idempotent() {
        let store = MemoryStore::new();
        store
            .stage_put("staging/j/scene.mp4", b"x".to_vec())
            .await
            .unwrap();

        store.delete_staged("staging/j/scene.mp4").await.unwrap();
        // Second delete on the same key is a no-op, never an error
        store.delete_staged("staging/j/scene.mp4").await.unwrap();
        assert!(!store.contains("staging/j/scene.mp4").await);
    }

    #[tokio::test]
    async fn test_stage_put_rejects_canonical_keys() {
        let store = MemoryStore::new();
        let err = store
            .stage_put("campaigns/c/final.mp4", b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_get_all_preserves_order() {
        let store = MemoryStore::new();
        store.put_canonical("campaigns/c/scenes/0.mp4", b"a".to_vec()).await;
        store.put_canonical("campaigns/c/scenes/1.mp4", b"b".to_vec()).await;

        let keys = vec![
            "campaigns/c/scenes/1.mp4".to_string(),
            "campaigns/c/scenes/0.mp4".to_string(),
        ];
        let bytes = store.get_all(&keys).await.unwrap();
        assert_eq!(bytes, vec![b"b".to_vec(), b"a".to_vec()]);
    }
}
