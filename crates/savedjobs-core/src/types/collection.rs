//! A single user's saved jobs, keyed by job id.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Bookmark, JobId};

/// All bookmarks of one partition plus the removals not yet confirmed remotely
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCollection", into = "StoredCollection")]
pub struct BookmarkCollection {
    bookmarks: BTreeMap<JobId, Bookmark>,
    pending_removals: BTreeSet<JobId>,
}

/// On-disk shape: a flat list is friendlier to JSON than an integer-keyed map.
#[derive(Serialize, Deserialize)]
struct StoredCollection {
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pending_removals: Vec<JobId>,
}

impl From<StoredCollection> for BookmarkCollection {
    fn from(stored: StoredCollection) -> Self {
        let mut collection = Self {
            bookmarks: BTreeMap::new(),
            pending_removals: stored.pending_removals.into_iter().collect(),
        };
        for bookmark in stored.bookmarks {
            collection.upsert(bookmark);
        }
        collection
    }
}

impl From<BookmarkCollection> for StoredCollection {
    fn from(collection: BookmarkCollection) -> Self {
        Self {
            bookmarks: collection.bookmarks.into_values().collect(),
            pending_removals: collection.pending_removals.into_iter().collect(),
        }
    }
}

impl BookmarkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.bookmarks.contains_key(&job_id)
    }

    pub fn get(&self, job_id: JobId) -> Option<&Bookmark> {
        self.bookmarks.get(&job_id)
    }

    pub fn get_mut(&mut self, job_id: JobId) -> Option<&mut Bookmark> {
        self.bookmarks.get_mut(&job_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks.values()
    }

    pub fn job_ids(&self) -> BTreeSet<JobId> {
        self.bookmarks.keys().copied().collect()
    }

    /// Insert or refresh a bookmark from a local save.
    ///
    /// The new snapshot replaces the stored one, including its `synced`
    /// flag, but `saved_at` keeps the older of the two values. A fresh save
    /// stays unconfirmed until the server accepts it, so a later sync pushes
    /// it instead of treating it as removed elsewhere. Saving a job also
    /// cancels any pending removal for it.
    pub fn upsert(&mut self, mut bookmark: Bookmark) {
        self.pending_removals.remove(&bookmark.job_id);
        if let Some(existing) = self.bookmarks.get(&bookmark.job_id) {
            bookmark.saved_at = bookmark.saved_at.min(existing.saved_at);
        }
        self.bookmarks.insert(bookmark.job_id, bookmark);
    }

    /// Insert without the save-time adjustments. Used by reconciliation.
    pub(crate) fn put(&mut self, bookmark: Bookmark) {
        self.bookmarks.insert(bookmark.job_id, bookmark);
    }

    pub fn remove(&mut self, job_id: JobId) -> Option<Bookmark> {
        self.bookmarks.remove(&job_id)
    }

    pub fn pending_removals(&self) -> &BTreeSet<JobId> {
        &self.pending_removals
    }

    pub fn is_pending_removal(&self, job_id: JobId) -> bool {
        self.pending_removals.contains(&job_id)
    }

    /// Record that the remote copy of `job_id` still has to be deleted.
    pub fn mark_pending_removal(&mut self, job_id: JobId) {
        self.pending_removals.insert(job_id);
    }

    pub fn clear_pending_removal(&mut self, job_id: JobId) -> bool {
        self.pending_removals.remove(&job_id)
    }

    /// Bookmarks ordered for display: most recently saved first.
    pub fn newest_first(&self) -> Vec<Bookmark> {
        let mut list: Vec<Bookmark> = self.bookmarks.values().cloned().collect();
        list.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then(a.job_id.cmp(&b.job_id)));
        list
    }
}

impl FromIterator<Bookmark> for BookmarkCollection {
    fn from_iter<I: IntoIterator<Item = Bookmark>>(iter: I) -> Self {
        let mut collection = Self::new();
        for bookmark in iter {
            collection.upsert(bookmark);
        }
        collection
    }
}
