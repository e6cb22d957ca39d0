//! In-memory [`LocalStore`] for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::LocalStore;
use crate::error::{BookmarkError, BookmarkResult};
use crate::types::{BookmarkCollection, PartitionKey};

/// Volatile store keyed by partition
///
/// Every call yields to the scheduler once before touching the map, so
/// concurrent callers interleave the way they would against real I/O.
/// Failures can be switched on to exercise local-storage error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<PartitionKey, BookmarkCollection>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a partition without going through the trait.
    pub fn with_collection(self, partition: PartitionKey, collection: BookmarkCollection) -> Self {
        self.collections.write().insert(partition, collection);
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents of a partition, bypassing failure injection.
    pub fn snapshot(&self, partition: &PartitionKey) -> BookmarkCollection {
        self.collections
            .read()
            .get(partition)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn read(&self, partition: &PartitionKey) -> BookmarkResult<BookmarkCollection> {
        tokio::task::yield_now().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BookmarkError::Storage("injected read failure".to_string()));
        }
        Ok(self.snapshot(partition))
    }

    async fn write(
        &self,
        partition: &PartitionKey,
        collection: &BookmarkCollection,
    ) -> BookmarkResult<()> {
        tokio::task::yield_now().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BookmarkError::Storage("injected write failure".to_string()));
        }
        self.collections
            .write()
            .insert(partition.clone(), collection.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn purge(&self, partition: &PartitionKey) -> BookmarkResult<bool> {
        tokio::task::yield_now().await;
        Ok(self.collections.write().remove(partition).is_some())
    }

    async fn partitions(&self) -> BookmarkResult<Vec<PartitionKey>> {
        let mut keys: Vec<PartitionKey> = self.collections.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
