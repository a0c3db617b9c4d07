//! The object store contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Storage primitives the edit pipeline relies on.
///
/// Guarantees every implementation must provide:
/// - staged objects are invisible to canonical-path readers until
///   [`canonical_replace`](ObjectStore::canonical_replace) succeeds;
/// - `canonical_replace` is atomic with respect to readers of the
///   canonical key (a reader sees the old bytes or the new bytes,
///   never a torn write);
/// - [`delete_staged`](ObjectStore::delete_staged) is idempotent and
///   safe to call on any staged key at any time.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes to a staging key.
    async fn stage_put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()>;

    /// Atomically replace the canonical key's content with the staged
    /// object's content. The staged object remains until
    /// `delete_staged` is called.
    async fn canonical_replace(&self, staged_key: &str, canonical_key: &str) -> StorageResult<()>;

    /// Download one object.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Download several objects, preserving order.
    async fn get_all(&self, keys: &[String]) -> StorageResult<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    /// Delete a staged object. A no-op if the key is already absent.
    async fn delete_staged(&self, key: &str) -> StorageResult<()>;

    /// Resolve a canonical key to a time-limited playback URL.
    async fn resolve_url(&self, key: &str, expiry: Duration) -> StorageResult<String>;
}
