//! Saved Jobs Core Library
//!
//! Offline-first bookmarks for a job marketplace client.
//!
//! ## Overview
//!
//! Users save job listings to revisit later. Saved jobs must be readable and
//! writable without a network connection, survive restarts, and converge with
//! a remote bookmarks API whenever it is reachable. The API may not be
//! deployed yet, in which case the client runs local-only without noise.
//!
//! ## Core Principles
//!
//! - **Local-first**: every mutation lands in the local store before any
//!   network call
//! - **No lost saves**: a bookmark the server never confirmed is pushed,
//!   never dropped; only explicit unsaves delete remotely
//! - **Per-user partitions**: one collection per signed-in user, anonymous
//!   otherwise
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use savedjobs_core::{Bookmark, BookmarkService, HttpRemote, RedbStore, RemoteConfig, StaticIdentity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RedbStore::new("~/.savedjobs/data/savedjobs.redb")?);
//!     let remote = Arc::new(HttpRemote::new(&RemoteConfig::new("https://api.example.com/v1"))?);
//!     let service = BookmarkService::new(store, remote, Arc::new(StaticIdentity::user("42")));
//!
//!     service.save(Bookmark::new(42, "Backend Engineer").with_company("Acme")).await?;
//!     let report = service.sync().await?;
//!     println!("adopted {} bookmarks", report.adopted.len());
//!
//!     for bookmark in service.list().await? {
//!         println!("{}: {}", bookmark.job_id, bookmark.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod remote;
pub mod service;
pub mod storage;
pub mod sync;
pub mod types;

// Re-exports
pub use config::{RemoteConfig, ServiceConfig};
pub use error::{BookmarkError, BookmarkResult};
pub use identity::{IdentityResolver, SessionIdentity, StaticIdentity};
pub use remote::{DisabledRemote, HttpRemote, RemoteBookmark, RemoteBookmarks, RemoteOutcome};
pub use service::{AutoSync, BookmarkService, Propagation};
pub use storage::{LocalStore, MemoryStore, RedbStore};
pub use sync::{
    LocalOnlyReason, SyncCoordinator, SyncEvent, SyncMode, SyncReport, SyncStatus, SyncTrigger,
};
pub use types::*;
