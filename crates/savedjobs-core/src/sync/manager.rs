//! Per-partition sync coordination
//!
//! The `SyncCoordinator` owns the concurrency rules shared by the facade:
//!
//! - one write lock per partition, serializing every read-modify-write of
//!   the local collection (`save`, `unsave` and the write phases of `sync`)
//! - at most one reconciliation in flight per partition; later callers
//!   wait for it and share its result
//! - status tracking and a broadcast channel of [`SyncEvent`]s
//! - a generation counter per partition, bumped by a purge so an in-flight
//!   sync knows not to write its results back
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SyncCoordinator                                                │
//! │  ├── partitions: HashMap<PartitionKey, PartitionState>          │
//! │  │   ├── write_lock: async mutex around local RMW cycles        │
//! │  │   ├── generation: bumped on purge                            │
//! │  │   └── in_flight: Option<InFlight>                            │
//! │  │       ├── done: watch::Receiver<Option<shared result>>       │
//! │  │       └── removed: jobs unsaved while the sync runs          │
//! │  └── event_tx: broadcast::Sender<SyncEvent>                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch, OwnedMutexGuard};
use tracing::debug;

use super::events::{SyncEvent, SyncStatus};
use super::reconcile::SyncReport;
use crate::error::{BookmarkError, BookmarkResult};
use crate::types::{JobId, PartitionKey};

/// Default capacity for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result handed to callers that joined an in-flight sync
type SharedOutcome = Result<SyncReport, String>;

/// Held while mutating a partition's local collection
pub type PartitionGuard = OwnedMutexGuard<()>;

struct InFlight {
    done: watch::Receiver<Option<SharedOutcome>>,
    removed: BTreeSet<JobId>,
}

#[derive(Default)]
struct PartitionState {
    write_lock: Arc<tokio::sync::Mutex<()>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
}

enum Role {
    Leader(watch::Sender<Option<SharedOutcome>>),
    Follower(watch::Receiver<Option<SharedOutcome>>),
}

/// Clears the in-flight slot and reports `Idle`, even if the sync future is dropped.
struct InFlightGuard {
    state: Arc<PartitionState>,
    partition: PartitionKey,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *self.state.in_flight.lock() = None;
        let _ = self.event_tx.send(SyncEvent::StatusChanged {
            partition: self.partition.clone(),
            status: SyncStatus::Idle,
        });
    }
}

/// Coordinator for partition locks and single-flight syncs
pub struct SyncCoordinator {
    partitions: Mutex<HashMap<PartitionKey, Arc<PartitionState>>>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            partitions: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to sync events for all partitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }

    fn state(&self, partition: &PartitionKey) -> Arc<PartitionState> {
        self.partitions
            .lock()
            .entry(partition.clone())
            .or_default()
            .clone()
    }

    /// Current status of a partition.
    pub fn status(&self, partition: &PartitionKey) -> SyncStatus {
        let partitions = self.partitions.lock();
        match partitions.get(partition) {
            Some(state) if state.in_flight.lock().is_some() => SyncStatus::Syncing,
            _ => SyncStatus::Idle,
        }
    }

    /// Acquire the partition's write lock.
    ///
    /// Every read-modify-write of a partition's collection must happen while
    /// holding this guard. Never hold it across a remote call.
    pub async fn lock(&self, partition: &PartitionKey) -> PartitionGuard {
        let write_lock = self.state(partition).write_lock.clone();
        write_lock.lock_owned().await
    }

    /// Record a local removal so an in-flight sync does not re-adopt it.
    ///
    /// Call while holding the partition lock. No-op when no sync is running.
    pub fn note_removed(&self, partition: &PartitionKey, job_id: JobId) {
        let state = self.state(partition);
        let mut in_flight = state.in_flight.lock();
        if let Some(in_flight) = in_flight.as_mut() {
            in_flight.removed.insert(job_id);
        }
    }

    /// Removals recorded for the running sync so far. Call while holding the partition lock.
    pub fn removed_during_sync(&self, partition: &PartitionKey) -> BTreeSet<JobId> {
        let state = self.state(partition);
        let in_flight = state.in_flight.lock();
        in_flight
            .as_ref()
            .map(|in_flight| in_flight.removed.clone())
            .unwrap_or_default()
    }

    /// Current generation of a partition's stored collection.
    ///
    /// A sync captures this when it starts and re-checks it under the
    /// partition lock before each write.
    pub fn generation(&self, partition: &PartitionKey) -> u64 {
        self.state(partition).generation.load(Ordering::SeqCst)
    }

    /// Mark the partition's collection as replaced. Call while holding the partition lock.
    pub fn invalidate(&self, partition: &PartitionKey) {
        self.state(partition).generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Drop the bookkeeping of a partition nobody is using.
    ///
    /// Kept while a sync is in flight, while the write lock is held, or
    /// while another caller still holds a reference to the state.
    pub fn forget(&self, partition: &PartitionKey) -> bool {
        let mut partitions = self.partitions.lock();
        let idle = match partitions.get(partition) {
            Some(state) => {
                Arc::strong_count(state) == 1
                    && Arc::strong_count(&state.write_lock) == 1
                    && state.in_flight.lock().is_none()
            }
            None => return false,
        };
        if idle {
            partitions.remove(partition);
            debug!(%partition, "Dropped partition state");
        }
        idle
    }

    #[cfg(test)]
    pub(crate) fn is_tracked(&self, partition: &PartitionKey) -> bool {
        self.partitions.lock().contains_key(partition)
    }

    /// Run `sync` unless one is already in flight for `partition`.
    ///
    /// A caller arriving while another sync runs does not start a second
    /// reconciliation; it waits and returns the running sync's result.
    pub async fn run<F, Fut>(&self, partition: &PartitionKey, sync: F) -> BookmarkResult<SyncReport>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BookmarkResult<SyncReport>>,
    {
        let state = self.state(partition);
        let role = {
            let mut slot = state.in_flight.lock();
            match slot.as_ref() {
                Some(in_flight) => Role::Follower(in_flight.done.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(InFlight {
                        done: rx,
                        removed: BTreeSet::new(),
                    });
                    Role::Leader(tx)
                }
            }
        };

        let done_tx = match role {
            Role::Follower(rx) => {
                debug!(%partition, "Sync already in flight, waiting for it");
                return Self::wait_for(rx).await;
            }
            Role::Leader(tx) => tx,
        };

        let guard = InFlightGuard {
            state,
            partition: partition.clone(),
            event_tx: self.event_tx.clone(),
        };
        self.emit(SyncEvent::StatusChanged {
            partition: partition.clone(),
            status: SyncStatus::Syncing,
        });

        let result = sync().await;

        let shared = match &result {
            Ok(report) => Ok(report.clone()),
            Err(e) => Err(e.to_string()),
        };
        done_tx.send_replace(Some(shared));
        drop(guard);

        match &result {
            Ok(report) => self.emit(SyncEvent::Synced {
                partition: partition.clone(),
                report: report.clone(),
            }),
            Err(e) => self.emit(SyncEvent::SyncFailed {
                partition: partition.clone(),
                message: e.to_string(),
            }),
        }
        result
    }

    async fn wait_for(mut rx: watch::Receiver<Option<SharedOutcome>>) -> BookmarkResult<SyncReport> {
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(BookmarkError::SyncAborted(message)),
            None => Err(BookmarkError::SyncAborted(
                "in-flight sync was cancelled".to_string(),
            )),
        }
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
