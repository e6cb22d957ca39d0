//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use savedjobs_core::{
    BookmarkService, JobId, MemoryStore, PartitionKey, RemoteBookmark, RemoteBookmarks,
    RemoteOutcome, StaticIdentity, UserId,
};

/// A recorded remote mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create(JobId),
    Remove(JobId),
}

/// How the fake answers a class of request
#[derive(Debug, Clone)]
pub enum Mode {
    /// Behave like a working server backed by `FakeRemote::server`
    Up,
    Absent,
    Down(String),
    Unauthorized,
}

impl Mode {
    fn outcome<T>(&self, value: impl FnOnce() -> T) -> RemoteOutcome<T> {
        match self {
            Mode::Up => RemoteOutcome::Success(value()),
            Mode::Absent => RemoteOutcome::EndpointUnavailable,
            Mode::Down(reason) => RemoteOutcome::TransientFailure(reason.clone()),
            Mode::Unauthorized => RemoteOutcome::Unauthorized,
        }
    }
}

struct State {
    mode: Mode,
    server: BTreeMap<JobId, RemoteBookmark>,
    calls: Vec<Call>,
    lists: usize,
    failing_creates: HashMap<JobId, String>,
    list_delay: Duration,
    create_delay: Duration,
}

/// Scriptable in-process bookmarks server
///
/// In `Up` mode, creates and removes change the server-side set that later
/// listings return, so multi-step scenarios behave like a real backend.
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new(mode: Mode) -> Self {
        Self {
            state: Mutex::new(State {
                mode,
                server: BTreeMap::new(),
                calls: Vec::new(),
                lists: 0,
                failing_creates: HashMap::new(),
                list_delay: Duration::ZERO,
                create_delay: Duration::ZERO,
            }),
        }
    }

    pub fn up() -> Self {
        Self::new(Mode::Up)
    }

    pub fn absent() -> Self {
        Self::new(Mode::Absent)
    }

    pub fn set_mode(&self, mode: Mode) {
        self.state.lock().mode = mode;
    }

    /// Seed a server-side bookmark without recording a call.
    pub fn seed(&self, bookmark: RemoteBookmark) {
        self.state.lock().server.insert(bookmark.job_id, bookmark);
    }

    pub fn server_ids(&self) -> Vec<JobId> {
        self.state.lock().server.keys().copied().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn list_count(&self) -> usize {
        self.state.lock().lists
    }

    pub fn fail_create(&self, job_id: JobId, reason: &str) {
        self.state
            .lock()
            .failing_creates
            .insert(job_id, reason.to_string());
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().list_delay = delay;
    }

    /// Delay applied before a create reaches the server.
    pub fn set_create_delay(&self, delay: Duration) {
        self.state.lock().create_delay = delay;
    }
}

#[async_trait]
impl RemoteBookmarks for FakeRemote {
    async fn list(&self) -> RemoteOutcome<Vec<RemoteBookmark>> {
        // The response reflects the server at request time, however late it arrives.
        let (outcome, delay) = {
            let mut state = self.state.lock();
            state.lists += 1;
            let outcome = state.mode.outcome(|| state.server.values().cloned().collect());
            (outcome, state.list_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn create(&self, job_id: JobId) -> RemoteOutcome<()> {
        let delay = self.state.lock().create_delay;
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.calls.push(Call::Create(job_id));
        if let Some(reason) = state.failing_creates.get(&job_id) {
            return RemoteOutcome::TransientFailure(reason.clone());
        }
        let outcome = state.mode.outcome(|| ());
        if outcome.is_success() {
            state
                .server
                .entry(job_id)
                .or_insert_with(|| RemoteBookmark::new(job_id));
        }
        outcome
    }

    async fn remove(&self, job_id: JobId) -> RemoteOutcome<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.push(Call::Remove(job_id));
        let outcome = state.mode.outcome(|| ());
        if outcome.is_success() {
            state.server.remove(&job_id);
        }
        outcome
    }
}

/// Service for user "ana" over a fresh memory store.
pub fn service_with(remote: Arc<FakeRemote>) -> (Arc<BookmarkService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (service_over(store.clone(), remote, "ana"), store)
}

pub fn service_over(
    store: Arc<MemoryStore>,
    remote: Arc<FakeRemote>,
    user: &str,
) -> Arc<BookmarkService> {
    Arc::new(BookmarkService::new(
        store,
        remote,
        Arc::new(StaticIdentity::user(user)),
    ))
}

pub fn ana() -> PartitionKey {
    PartitionKey::User(UserId::new("ana"))
}
