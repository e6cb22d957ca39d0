//! Local persistence of bookmark collections.
//!
//! Each partition (one per user) is stored as a single JSON document. The
//! [`LocalStore`] trait is what the rest of the crate talks to, so tests can
//! swap the redb-backed [`RedbStore`] for the in-memory [`MemoryStore`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use crate::error::{BookmarkError, BookmarkResult};
use crate::types::{BookmarkCollection, PartitionKey};

mod memory;

pub use memory::MemoryStore;

/// One row per partition: storage key -> serialized collection
const SAVED_JOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("saved_jobs");

/// Durable per-partition storage of bookmark collections
///
/// Implementations never touch the network. `write` replaces the whole
/// collection in one step; serializing read-modify-write cycles is the
/// caller's job (see [`SyncCoordinator::lock`](crate::sync::SyncCoordinator::lock)).
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Load a partition's collection, or an empty one if nothing is stored.
    async fn read(&self, partition: &PartitionKey) -> BookmarkResult<BookmarkCollection>;

    /// Replace a partition's collection.
    async fn write(
        &self,
        partition: &PartitionKey,
        collection: &BookmarkCollection,
    ) -> BookmarkResult<()>;

    /// Delete a partition. Returns `true` if anything was stored.
    async fn purge(&self, partition: &PartitionKey) -> BookmarkResult<bool>;

    /// All partitions that currently have a stored collection.
    async fn partitions(&self) -> BookmarkResult<Vec<PartitionKey>>;
}

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<RwLock<Database>>,
}

impl RedbStore {
    /// Open (or create) the store at the given path.
    ///
    /// Creates the parent directory and the table if needed.
    pub fn new(path: impl AsRef<Path>) -> BookmarkResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SAVED_JOBS_TABLE)?;
        }
        write_txn.commit()?;

        info!(?path, "Opened bookmark store");
        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Run a redb transaction on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> BookmarkResult<T>
    where
        F: FnOnce(&RedbStore) -> BookmarkResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| BookmarkError::Storage(format!("storage task failed: {}", e)))?
    }

    fn load(&self, partition: &PartitionKey) -> BookmarkResult<BookmarkCollection> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SAVED_JOBS_TABLE)?;
        let key = partition.storage_key();

        match table.get(key.as_str())? {
            Some(v) => serde_json::from_slice(v.value())
                .map_err(|e| BookmarkError::Serialization(e.to_string())),
            None => Ok(BookmarkCollection::new()),
        }
    }

    fn save(&self, partition: &PartitionKey, collection: &BookmarkCollection) -> BookmarkResult<()> {
        let data =
            serde_json::to_vec(collection).map_err(|e| BookmarkError::Serialization(e.to_string()))?;

        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SAVED_JOBS_TABLE)?;
            let key = partition.storage_key();
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        debug!(%partition, bookmarks = collection.len(), "Wrote collection");
        Ok(())
    }

    fn delete(&self, partition: &PartitionKey) -> BookmarkResult<bool> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        let mut table = write_txn.open_table(SAVED_JOBS_TABLE)?;
        let key = partition.storage_key();
        let existed = table.remove(key.as_str())?.is_some();
        drop(table);
        write_txn.commit()?;
        Ok(existed)
    }

    fn keys(&self) -> BookmarkResult<Vec<PartitionKey>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SAVED_JOBS_TABLE)?;

        let mut partitions = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            if let Some(partition) = PartitionKey::from_storage_key(key.value()) {
                partitions.push(partition);
            }
        }
        partitions.sort();
        Ok(partitions)
    }
}

#[async_trait]
impl LocalStore for RedbStore {
    async fn read(&self, partition: &PartitionKey) -> BookmarkResult<BookmarkCollection> {
        let partition = partition.clone();
        self.blocking(move |store| store.load(&partition)).await
    }

    async fn write(
        &self,
        partition: &PartitionKey,
        collection: &BookmarkCollection,
    ) -> BookmarkResult<()> {
        let partition = partition.clone();
        let collection = collection.clone();
        self.blocking(move |store| store.save(&partition, &collection)).await
    }

    async fn purge(&self, partition: &PartitionKey) -> BookmarkResult<bool> {
        let key = partition.clone();
        let existed = self.blocking(move |store| store.delete(&key)).await?;
        if existed {
            info!(%partition, "Purged partition");
        }
        Ok(existed)
    }

    async fn partitions(&self) -> BookmarkResult<Vec<PartitionKey>> {
        self.blocking(|store| store.keys()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bookmark, JobId, UserId};
    use tempfile::TempDir;

    fn create_test_store() -> (RedbStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.redb");
        let store = RedbStore::new(&db_path).unwrap();
        (store, temp_dir)
    }

    fn alice() -> PartitionKey {
        PartitionKey::User(UserId::new("alice"))
    }

    #[test]
    fn test_store_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/path/to/test.redb");
        let store = RedbStore::new(&db_path);
        assert!(store.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_read_missing_partition_is_empty() {
        let (store, _temp) = create_test_store();
        let collection = store.read(&alice()).await.unwrap();
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_write_and_read_collection() {
        let (store, _temp) = create_test_store();

        let mut collection = BookmarkCollection::new();
        collection.upsert(Bookmark::new(1, "Platform Engineer").with_company("Initech"));
        collection.mark_pending_removal(JobId(9));
        store.write(&alice(), &collection).await.unwrap();

        let loaded = store.read(&alice()).await.unwrap();
        assert_eq!(loaded, collection);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let (store, _temp) = create_test_store();
        let bob = PartitionKey::User(UserId::new("bob"));

        let mut collection = BookmarkCollection::new();
        collection.upsert(Bookmark::new(1, "Only for alice"));
        store.write(&alice(), &collection).await.unwrap();

        assert!(store.read(&bob).await.unwrap().is_empty());
        assert!(store.read(&PartitionKey::Anonymous).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_only_one_partition() {
        let (store, _temp) = create_test_store();
        let bob = PartitionKey::User(UserId::new("bob"));

        let collection: BookmarkCollection = vec![Bookmark::new(3, "QA")].into_iter().collect();
        store.write(&alice(), &collection).await.unwrap();
        store.write(&bob, &collection).await.unwrap();

        assert!(store.purge(&alice()).await.unwrap());
        assert!(!store.purge(&alice()).await.unwrap());

        assert!(store.read(&alice()).await.unwrap().is_empty());
        assert_eq!(store.read(&bob).await.unwrap().len(), 1);
        assert_eq!(store.partitions().await.unwrap(), vec![bob]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_to_different_partitions() {
        let (store, _temp) = create_test_store();
        let bob = PartitionKey::User(UserId::new("bob"));

        let alice_jobs: BookmarkCollection = vec![Bookmark::new(1, "A")].into_iter().collect();
        let bob_jobs: BookmarkCollection =
            vec![Bookmark::new(2, "B"), Bookmark::new(3, "C")].into_iter().collect();
        let alice_key = alice();
        let (a, b) = tokio::join!(
            store.write(&alice_key, &alice_jobs),
            store.write(&bob, &bob_jobs)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(store.read(&alice()).await.unwrap(), alice_jobs);
        assert_eq!(store.read(&bob).await.unwrap(), bob_jobs);
        assert_eq!(store.partitions().await.unwrap(), vec![alice(), bob]);
    }

    #[tokio::test]
    async fn test_collection_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.redb");

        {
            let store = RedbStore::new(&db_path).unwrap();
            let collection: BookmarkCollection =
                vec![Bookmark::new(42, "Data Engineer")].into_iter().collect();
            store.write(&alice(), &collection).await.unwrap();
        }

        {
            let store = RedbStore::new(&db_path).unwrap();
            let loaded = store.read(&alice()).await.unwrap();
            assert!(loaded.contains(JobId(42)));
        }
    }
}
