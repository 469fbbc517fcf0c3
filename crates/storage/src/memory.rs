//! In-process object store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use studyhub_core::storage::{AssetStorage, StorageError};
use tokio::sync::RwLock;

/// Keeps object keys in memory. Copies only record the destination key.
///
/// [`fail_next_copies`](Self::fail_next_copies) makes upcoming copies fail
/// with a transient error, to exercise retry paths.
#[derive(Debug, Default)]
pub struct MemoryAssetStorage {
    objects: RwLock<HashSet<(String, String)>>,
    pending_failures: AtomicUsize,
    copies: AtomicUsize,
}

impl MemoryAssetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, bucket: &str, key: &str) {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()));
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .await
            .contains(&(bucket.to_string(), key.to_string()))
    }

    /// Number of successful copies so far.
    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn fail_next_copies(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    fn take_pending_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AssetStorage for MemoryAssetStorage {
    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.contains(bucket, key).await)
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        if self.take_pending_failure() {
            return Err(StorageError::Transient("injected copy failure".into()));
        }

        let mut objects = self.objects.write().await;
        if !objects.contains(&(bucket.to_string(), src_key.to_string())) {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: src_key.to_string(),
            });
        }
        objects.insert((bucket.to_string(), dst_key.to_string()));
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
