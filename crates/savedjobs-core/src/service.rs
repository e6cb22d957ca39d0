//! Bookmark facade
//!
//! `BookmarkService` is the operation set the UI layer consumes. Every
//! mutation lands in the local store first and only then is propagated to the
//! remote API on a best-effort basis, so the UI never waits on the network to
//! show a saved job.
//!
//! ```text
//! save/unsave ──► LocalStore (under partition lock) ──► RemoteBookmarks
//!                                                        │
//! sync ──► SyncCoordinator::run ──► list ──► reconcile ──┘ create/remove
//! ```

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{BookmarkError, BookmarkResult};
use crate::identity::IdentityResolver;
use crate::remote::{RemoteBookmarks, RemoteOutcome};
use crate::storage::LocalStore;
use crate::sync::{
    reconcile, ReconcilePlan, SyncCoordinator, SyncEvent, SyncReport, SyncStatus, SyncTrigger,
};
use crate::types::{Bookmark, JobId, PartitionKey};

/// How far a local mutation got
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    /// The remote store confirmed the change
    Synced,
    /// The bookmarks endpoint does not exist; the change is local-only
    LocalOnly,
    /// Transient or auth failure; the next sync retries it
    Deferred(String),
}

impl Propagation {
    fn from_outcome(operation: &str, job_id: JobId, outcome: &RemoteOutcome<()>) -> Self {
        match outcome {
            RemoteOutcome::Success(()) => Self::Synced,
            RemoteOutcome::EndpointUnavailable => {
                debug!(operation, %job_id, "Bookmarks endpoint unavailable, keeping change local");
                Self::LocalOnly
            }
            RemoteOutcome::TransientFailure(reason) => {
                warn!(operation, %job_id, %reason, "Remote call failed, deferring to next sync");
                Self::Deferred(reason.clone())
            }
            RemoteOutcome::Unauthorized => {
                warn!(operation, %job_id, "Remote rejected credentials, deferring to next sync");
                Self::Deferred("unauthorized".to_string())
            }
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::LocalOnly => write!(f, "local only"),
            Self::Deferred(reason) => write!(f, "pending ({})", reason),
        }
    }
}

/// Background auto-sync task; stops when dropped.
pub struct AutoSync {
    handle: JoinHandle<()>,
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Offline-first saved jobs
///
/// The active partition is resolved from the [`IdentityResolver`] at the
/// start of every call, so a session switch takes effect on the next
/// operation.
pub struct BookmarkService {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteBookmarks>,
    identity: Arc<dyn IdentityResolver>,
    coordinator: SyncCoordinator,
    config: ServiceConfig,
}

impl BookmarkService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteBookmarks>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            store,
            remote,
            identity,
            coordinator: SyncCoordinator::new(),
            config: ServiceConfig::default(),
        }
    }

    pub fn with_config(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteBookmarks>,
        identity: Arc<dyn IdentityResolver>,
        config: ServiceConfig,
    ) -> BookmarkResult<Self> {
        if config.auto_sync_interval.is_zero() {
            return Err(BookmarkError::InvalidConfig(
                "auto-sync interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            ..Self::new(store, remote, identity)
        })
    }

    /// Partition of the currently active user.
    pub fn partition(&self) -> PartitionKey {
        self.identity.partition()
    }

    /// Save a job.
    ///
    /// The bookmark is durable locally before this returns; the remote
    /// `create` is attempted once. Saving an already-saved job keeps the
    /// older `saved_at`. Fails only if the local store does.
    pub async fn save(&self, bookmark: Bookmark) -> BookmarkResult<Propagation> {
        let partition = self.partition();
        let job_id = bookmark.job_id;

        {
            let _guard = self.coordinator.lock(&partition).await;
            let mut local = self.store.read(&partition).await?;
            local.upsert(bookmark);
            self.store.write(&partition, &local).await?;
        }
        debug!(%partition, %job_id, "Saved bookmark locally");

        let outcome = self.remote.create(job_id).await;
        let propagation = Propagation::from_outcome("create", job_id, &outcome);
        if propagation == Propagation::Synced {
            if let Err(e) = self.mark_synced(&partition, job_id).await {
                warn!(%partition, %job_id, error = %e, "Failed to record remote confirmation");
            }
        }
        Ok(propagation)
    }

    /// Unsave a job.
    ///
    /// Removed locally before the remote call. If the remote removal cannot
    /// be confirmed, a tombstone keeps the job from coming back and the next
    /// sync retries the removal.
    pub async fn unsave(&self, job_id: JobId) -> BookmarkResult<Propagation> {
        let partition = self.partition();

        {
            let _guard = self.coordinator.lock(&partition).await;
            let mut local = self.store.read(&partition).await?;
            local.remove(job_id);
            local.mark_pending_removal(job_id);
            self.coordinator.note_removed(&partition, job_id);
            self.store.write(&partition, &local).await?;
        }
        debug!(%partition, %job_id, "Removed bookmark locally");

        let outcome = self.remote.remove(job_id).await;
        let propagation = Propagation::from_outcome("remove", job_id, &outcome);
        if !propagation.is_deferred() {
            // A leftover tombstone is retried by the next sync.
            if let Err(e) = self.clear_tombstone(&partition, job_id).await {
                warn!(%partition, %job_id, error = %e, "Failed to clear pending removal");
            }
        }
        Ok(propagation)
    }

    pub async fn is_saved(&self, job_id: JobId) -> BookmarkResult<bool> {
        let local = self.store.read(&self.partition()).await?;
        Ok(local.contains(job_id))
    }

    /// Saved jobs of the active user, newest first.
    pub async fn list(&self) -> BookmarkResult<Vec<Bookmark>> {
        let local = self.store.read(&self.partition()).await?;
        Ok(local.newest_first())
    }

    /// Reconcile the active partition with the remote store.
    pub async fn sync(&self) -> BookmarkResult<SyncReport> {
        self.sync_with(SyncTrigger::Explicit).await
    }

    /// Reconcile, tagging the run with what asked for it.
    ///
    /// If a sync is already running for the partition this waits for it and
    /// returns its report instead of starting another.
    pub async fn sync_with(&self, trigger: SyncTrigger) -> BookmarkResult<SyncReport> {
        let partition = self.partition();
        self.coordinator
            .run(&partition, || self.run_sync(&partition, trigger))
            .await
    }

    pub fn status(&self) -> SyncStatus {
        self.coordinator.status(&self.partition())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.coordinator.subscribe()
    }

    /// Partitions with a stored collection.
    pub async fn partitions(&self) -> BookmarkResult<Vec<PartitionKey>> {
        self.store.partitions().await
    }

    /// Delete a partition's collection, e.g. after a user signs out for good.
    ///
    /// A sync in flight for the partition keeps running its remote calls
    /// but writes nothing back. Returns `false` if nothing was stored.
    pub async fn purge_partition(&self, partition: &PartitionKey) -> BookmarkResult<bool> {
        let existed = {
            let _guard = self.coordinator.lock(partition).await;
            self.coordinator.invalidate(partition);
            self.store.purge(partition).await?
        };
        self.coordinator.forget(partition);
        Ok(existed)
    }

    /// Start syncing on [`ServiceConfig::auto_sync_interval`].
    ///
    /// The task holds only a weak reference and ends once the service is dropped.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> AutoSync {
        let period = self.config.auto_sync_interval;
        let service = Arc::downgrade(self);
        let handle = tokio::spawn(auto_sync_loop(service, period));
        AutoSync { handle }
    }

    async fn run_sync(
        &self,
        partition: &PartitionKey,
        trigger: SyncTrigger,
    ) -> BookmarkResult<SyncReport> {
        info!(%partition, %trigger, "Sync started");
        let generation = self.coordinator.generation(partition);

        let listing = self.remote.list().await;
        match &listing {
            RemoteOutcome::Success(list) => debug!(%partition, count = list.len(), "Remote listing"),
            RemoteOutcome::EndpointUnavailable => {
                debug!(%partition, "Bookmarks endpoint unavailable, syncing local-only")
            }
            RemoteOutcome::TransientFailure(reason) => {
                warn!(%partition, %reason, "Remote listing failed, syncing local-only")
            }
            RemoteOutcome::Unauthorized => {
                warn!(%partition, "Remote rejected credentials, syncing local-only")
            }
        }

        let ReconcilePlan {
            to_create,
            to_remove,
            mut report,
            ..
        } = {
            let _guard = self.coordinator.lock(partition).await;
            self.ensure_generation(partition, generation)?;
            let local = self.store.read(partition).await?;
            let recently_removed = self.coordinator.removed_during_sync(partition);
            let plan = reconcile(&local, &listing, &recently_removed, Utc::now());
            if plan.converged != local {
                self.store.write(partition, &plan.converged).await?;
            }
            plan
        };
        report.trigger = trigger;

        for job_id in to_create {
            match self.remote.create(job_id).await {
                RemoteOutcome::Success(()) => report.pushed.push(job_id),
                outcome => {
                    warn!(%partition, %job_id, %outcome, "Push failed, will retry next sync");
                    report.push_failed.push(job_id);
                }
            }
        }
        for job_id in to_remove {
            match self.remote.remove(job_id).await {
                RemoteOutcome::Success(()) | RemoteOutcome::EndpointUnavailable => {
                    report.removed.push(job_id)
                }
                outcome => {
                    warn!(%partition, %job_id, %outcome, "Removal retry failed");
                    report.removal_failed.push(job_id);
                }
            }
        }

        if !report.pushed.is_empty() || !report.removed.is_empty() {
            self.record_confirmations(partition, generation, &report).await?;
        }

        info!(
            %partition,
            %trigger,
            local_only = report.is_local_only(),
            adopted = report.adopted.len(),
            pushed = report.pushed.len(),
            failed = report.push_failed.len() + report.removal_failed.len(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Apply confirmed pushes and removals to the current local collection.
    async fn record_confirmations(
        &self,
        partition: &PartitionKey,
        generation: u64,
        report: &SyncReport,
    ) -> BookmarkResult<()> {
        let _guard = self.coordinator.lock(partition).await;
        self.ensure_generation(partition, generation)?;
        let unsaved_meanwhile = self.coordinator.removed_during_sync(partition);
        let mut local = self.store.read(partition).await?;
        for job_id in &report.pushed {
            match local.get_mut(*job_id) {
                Some(bookmark) => bookmark.synced = true,
                // Unsaved while the push was in flight: the server has it again.
                None if unsaved_meanwhile.contains(job_id) => {
                    local.mark_pending_removal(*job_id)
                }
                None => {}
            }
        }
        for job_id in &report.removed {
            local.clear_pending_removal(*job_id);
        }
        self.store.write(partition, &local).await
    }

    /// Fail the running sync if the partition was purged since it started.
    /// Call while holding the partition lock.
    fn ensure_generation(&self, partition: &PartitionKey, generation: u64) -> BookmarkResult<()> {
        if self.coordinator.generation(partition) == generation {
            return Ok(());
        }
        warn!(%partition, "Partition purged during sync, discarding results");
        Err(BookmarkError::SyncAborted(format!(
            "{} was purged during sync",
            partition
        )))
    }

    async fn clear_tombstone(&self, partition: &PartitionKey, job_id: JobId) -> BookmarkResult<()> {
        let _guard = self.coordinator.lock(partition).await;
        let mut local = self.store.read(partition).await?;
        if local.clear_pending_removal(job_id) {
            self.store.write(partition, &local).await?;
        }
        Ok(())
    }

    async fn mark_synced(&self, partition: &PartitionKey, job_id: JobId) -> BookmarkResult<()> {
        let _guard = self.coordinator.lock(partition).await;
        let mut local = self.store.read(partition).await?;
        match local.get_mut(job_id) {
            Some(bookmark) if !bookmark.synced => bookmark.synced = true,
            _ => return Ok(()),
        }
        self.store.write(partition, &local).await
    }
}

async fn auto_sync_loop(service: Weak<BookmarkService>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(service) = service.upgrade() else {
            debug!("Bookmark service dropped, stopping auto-sync");
            break;
        };
        if let Err(e) = service.sync_with(SyncTrigger::Periodic).await {
            warn!(error = %e, "Periodic sync failed");
        }
    }
}
