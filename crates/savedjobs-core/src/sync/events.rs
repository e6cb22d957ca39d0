//! Sync status and event types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SyncStatus: Per-partition state                                │
//! │  ├── Idle: No reconciliation running                            │
//! │  └── Syncing: A reconciliation is in flight                     │
//! │                                                                 │
//! │  SyncEvent: Notifications about sync activity                   │
//! │  ├── StatusChanged: Partition moved between Idle and Syncing    │
//! │  ├── Synced: Reconciliation finished (possibly local-only)      │
//! │  └── SyncFailed: Local storage failed during reconciliation     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use super::reconcile::SyncReport;
use crate::types::PartitionKey;

/// Status of synchronization for a partition
///
/// There is no error state: a failed sync returns to `Idle` and reports the
/// failure through its return value and a [`SyncEvent::SyncFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "Idle"),
            SyncStatus::Syncing => write!(f, "Syncing"),
        }
    }
}

/// What asked for a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncTrigger {
    /// The app came to the foreground
    AppFocus,
    /// Pull-to-refresh or similar
    ManualRefresh,
    /// An explicit "sync" action
    #[default]
    Explicit,
    /// The background auto-sync timer
    Periodic,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTrigger::AppFocus => "app-focus",
            SyncTrigger::ManualRefresh => "manual-refresh",
            SyncTrigger::Explicit => "explicit",
            SyncTrigger::Periodic => "periodic",
        };
        f.write_str(name)
    }
}

/// Events emitted during synchronization
#[derive(Debug, Clone)]
pub enum SyncEvent {
    StatusChanged {
        partition: PartitionKey,
        status: SyncStatus,
    },
    Synced {
        partition: PartitionKey,
        report: SyncReport,
    },
    SyncFailed {
        partition: PartitionKey,
        message: String,
    },
}

impl SyncEvent {
    pub fn partition(&self) -> &PartitionKey {
        match self {
            SyncEvent::StatusChanged { partition, .. }
            | SyncEvent::Synced { partition, .. }
            | SyncEvent::SyncFailed { partition, .. } => partition,
        }
    }
}
