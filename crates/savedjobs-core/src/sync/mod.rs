//! Synchronization between the local store and the remote API
//!
//! - [`reconcile`]: pure merge of a local collection with a remote listing
//! - [`manager`]: partition locks, single-flight syncs and sync events
//! - [`events`]: status and event types broadcast to subscribers

pub mod events;
pub mod manager;
pub mod reconcile;

pub use events::{SyncEvent, SyncStatus, SyncTrigger};
pub use manager::{PartitionGuard, SyncCoordinator};
pub use reconcile::{merge_bookmark, reconcile, LocalOnlyReason, ReconcilePlan, SyncMode, SyncReport};
