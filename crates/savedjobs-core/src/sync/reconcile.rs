//! Reconciliation of a local collection against the remote listing
//!
//! Pure computation, no I/O: given what the device has and what the server
//! reported, produce the converged collection plus the remote calls needed
//! to bring the server up to date.
//!
//! ## Rules
//!
//! - Remote unreadable: keep the local collection as-is, issue nothing.
//! - In both: merge field by field, local wins when both sides are
//!   non-empty, oldest `saved_at` wins.
//! - Only local, not yet confirmed (`synced == false`): keep, queue `create`.
//! - Only local, confirmed by an earlier sync: the user removed it on another
//!   device. Drop it locally, issue nothing.
//! - Only remote: adopt, unless the user removed it here (tombstone or a
//!   removal made while this sync was in flight).
//! - Remote bookmarks are never deleted because of a missing local entry.
//!   The only `remove` calls come from tombstones left by an explicit unsave.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::events::SyncTrigger;
use crate::remote::{RemoteBookmark, RemoteOutcome};
use crate::types::{Bookmark, BookmarkCollection, JobId};

/// Why a sync ran without the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOnlyReason {
    EndpointUnavailable,
    TransientFailure(String),
    Unauthorized,
}

/// Whether the remote listing took part in a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Remote,
    LocalOnly(LocalOnlyReason),
}

/// Summary of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    pub mode: SyncMode,
    /// Remote-only bookmarks added locally
    pub adopted: Vec<JobId>,
    /// Bookmarks present on both sides whose local copy changed
    pub merged: Vec<JobId>,
    /// Local-only bookmarks the server accepted
    pub pushed: Vec<JobId>,
    /// Local-only bookmarks whose push failed; retried next sync
    pub push_failed: Vec<JobId>,
    /// Confirmed bookmarks the server no longer lists, dropped locally
    pub dropped: Vec<JobId>,
    /// Pending removals the server confirmed
    pub removed: Vec<JobId>,
    /// Pending removals that failed again
    pub removal_failed: Vec<JobId>,
}

impl SyncReport {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            trigger: SyncTrigger::default(),
            mode,
            adopted: Vec::new(),
            merged: Vec::new(),
            pushed: Vec::new(),
            push_failed: Vec::new(),
            dropped: Vec::new(),
            removed: Vec::new(),
            removal_failed: Vec::new(),
        }
    }

    pub fn is_local_only(&self) -> bool {
        matches!(self.mode, SyncMode::LocalOnly(_))
    }

    /// Number of remote mutations attempted.
    pub fn remote_mutations(&self) -> usize {
        self.pushed.len() + self.push_failed.len() + self.removed.len() + self.removal_failed.len()
    }

    /// Remote reachable and every queued mutation succeeded.
    pub fn is_converged(&self) -> bool {
        !self.is_local_only() && self.push_failed.is_empty() && self.removal_failed.is_empty()
    }
}

/// Output of [`reconcile`]
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Collection to write back to the local store
    pub converged: BookmarkCollection,
    /// `create` calls to issue, in job id order
    pub to_create: Vec<JobId>,
    /// `remove` retries for pending removals still listed remotely
    pub to_remove: Vec<JobId>,
    pub report: SyncReport,
}

impl ReconcilePlan {
    fn local_only(local: &BookmarkCollection, reason: LocalOnlyReason) -> Self {
        Self {
            converged: local.clone(),
            to_create: Vec::new(),
            to_remove: Vec::new(),
            report: SyncReport::new(SyncMode::LocalOnly(reason)),
        }
    }

    pub fn has_remote_work(&self) -> bool {
        !self.to_create.is_empty() || !self.to_remove.is_empty()
    }
}

/// Compute the converged state and the remote calls needed to reach it.
///
/// `recently_removed` holds jobs unsaved after the remote listing was
/// requested; they are never re-adopted from that listing. `now` stamps
/// adopted bookmarks the server sent without a timestamp.
pub fn reconcile(
    local: &BookmarkCollection,
    remote: &RemoteOutcome<Vec<RemoteBookmark>>,
    recently_removed: &BTreeSet<JobId>,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let listing = match remote {
        RemoteOutcome::Success(listing) => listing,
        RemoteOutcome::EndpointUnavailable => {
            return ReconcilePlan::local_only(local, LocalOnlyReason::EndpointUnavailable)
        }
        RemoteOutcome::TransientFailure(reason) => {
            return ReconcilePlan::local_only(
                local,
                LocalOnlyReason::TransientFailure(reason.clone()),
            )
        }
        RemoteOutcome::Unauthorized => {
            return ReconcilePlan::local_only(local, LocalOnlyReason::Unauthorized)
        }
    };

    let remote = index_remote(listing);
    let mut converged = BookmarkCollection::new();
    let mut report = SyncReport::new(SyncMode::Remote);
    let mut to_create = Vec::new();
    let mut to_remove = Vec::new();

    for bookmark in local.iter() {
        match remote.get(&bookmark.job_id) {
            Some(theirs) => {
                let merged = merge_bookmark(bookmark, theirs);
                if &merged != bookmark {
                    report.merged.push(bookmark.job_id);
                }
                converged.put(merged);
            }
            // Removed on another device after this one last synced.
            None if bookmark.synced => report.dropped.push(bookmark.job_id),
            None => {
                converged.put(bookmark.clone());
                to_create.push(bookmark.job_id);
            }
        }
    }

    for (job_id, theirs) in &remote {
        if local.contains(*job_id) {
            continue;
        }
        if local.is_pending_removal(*job_id) {
            converged.mark_pending_removal(*job_id);
            to_remove.push(*job_id);
        } else if !recently_removed.contains(job_id) {
            converged.put(theirs.clone().into_bookmark(now));
            report.adopted.push(*job_id);
        }
    }
    // Tombstones for jobs the server no longer lists are simply dropped.

    ReconcilePlan {
        converged,
        to_create,
        to_remove,
        report,
    }
}

/// Merge one bookmark present on both sides.
///
/// Each optional field takes the local value when it is non-empty and the
/// remote value otherwise. `saved_at` takes the older timestamp.
pub fn merge_bookmark(local: &Bookmark, remote: &RemoteBookmark) -> Bookmark {
    let title = if !is_blank(&local.title) {
        local.title.clone()
    } else {
        remote
            .title
            .clone()
            .filter(|t| !is_blank(t))
            .unwrap_or_else(|| local.title.clone())
    };

    Bookmark {
        job_id: local.job_id,
        title,
        company_name: prefer_text(&local.company_name, &remote.company_name),
        min_salary: local.min_salary.or(remote.min_salary),
        max_salary: local.max_salary.or(remote.max_salary),
        currency: prefer_text(&local.currency, &remote.currency),
        city: prefer_text(&local.city, &remote.city),
        country: prefer_text(&local.country, &remote.country),
        location_type: prefer_text(&local.location_type, &remote.location_type),
        employment_type: prefer_text(&local.employment_type, &remote.employment_type),
        saved_at: match remote.saved_at {
            Some(theirs) => local.saved_at.min(theirs),
            None => local.saved_at,
        },
        synced: true,
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn prefer_text(local: &Option<String>, remote: &Option<String>) -> Option<String> {
    match (local, remote) {
        (Some(ours), _) if !is_blank(ours) => Some(ours.clone()),
        (_, Some(theirs)) if !is_blank(theirs) => Some(theirs.clone()),
        _ => local.clone(),
    }
}

/// Index the listing by job id, folding duplicate entries together.
fn index_remote(listing: &[RemoteBookmark]) -> BTreeMap<JobId, RemoteBookmark> {
    let mut index: BTreeMap<JobId, RemoteBookmark> = BTreeMap::new();
    for item in listing {
        match index.get_mut(&item.job_id) {
            Some(existing) => fold_duplicate(existing, item),
            None => {
                index.insert(item.job_id, item.clone());
            }
        }
    }
    index
}

fn fold_duplicate(existing: &mut RemoteBookmark, other: &RemoteBookmark) {
    fn fill(slot: &mut Option<String>, other: &Option<String>) {
        if slot.as_deref().map_or(true, is_blank) {
            if let Some(value) = other.as_deref().filter(|v| !is_blank(v)) {
                *slot = Some(value.to_string());
            }
        }
    }

    fill(&mut existing.title, &other.title);
    fill(&mut existing.company_name, &other.company_name);
    fill(&mut existing.currency, &other.currency);
    fill(&mut existing.city, &other.city);
    fill(&mut existing.country, &other.country);
    fill(&mut existing.location_type, &other.location_type);
    fill(&mut existing.employment_type, &other.employment_type);
    existing.min_salary = existing.min_salary.or(other.min_salary);
    existing.max_salary = existing.max_salary.or(other.max_salary);
    existing.saved_at = match (existing.saved_at, other.saved_at) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
}
