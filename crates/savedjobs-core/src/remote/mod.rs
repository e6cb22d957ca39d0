//! Remote bookmarks API
//!
//! ## Overview
//!
//! The remote side may not exist yet: during soft launch the bookmarks route
//! answers 404. Every call therefore returns a [`RemoteOutcome`] instead of an
//! error, and callers decide policy per call rather than consulting a cached
//! "feature available" flag.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  RemoteOutcome                                                  │
//! │  ├── Success(T)           request completed                     │
//! │  ├── EndpointUnavailable  route absent (404), run local-only    │
//! │  ├── TransientFailure     network, timeout, 5xx; retry later    │
//! │  └── Unauthorized         401/403; retry after re-auth          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Bookmark, JobId};

pub mod http;

pub use http::HttpRemote;

/// Classified result of a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    Success(T),
    /// The bookmarks feature is not deployed on the server
    EndpointUnavailable,
    /// Retryable failure; the reason is for logs only
    TransientFailure(String),
    /// Credentials were rejected
    Unauthorized,
}

impl<T> RemoteOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<T> fmt::Display for RemoteOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => write!(f, "success"),
            Self::EndpointUnavailable => write!(f, "endpoint unavailable"),
            Self::TransientFailure(reason) => write!(f, "transient failure: {}", reason),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Bookmark snapshot as the API returns it
///
/// Everything except the job id is optional on the wire. A missing
/// `savedAt` means the server does not know when the job was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBookmark {
    pub job_id: JobId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub max_salary: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl RemoteBookmark {
    /// Bare snapshot carrying only the job id.
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            title: None,
            company_name: None,
            min_salary: None,
            max_salary: None,
            currency: None,
            city: None,
            country: None,
            location_type: None,
            employment_type: None,
            saved_at: None,
        }
    }

    /// Convert into a local bookmark the server is known to hold.
    ///
    /// `fallback_saved_at` is used when the server did not send a timestamp.
    pub fn into_bookmark(self, fallback_saved_at: DateTime<Utc>) -> Bookmark {
        Bookmark {
            job_id: self.job_id,
            title: self.title.unwrap_or_default(),
            company_name: self.company_name,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            currency: self.currency,
            city: self.city,
            country: self.country,
            location_type: self.location_type,
            employment_type: self.employment_type,
            saved_at: self.saved_at.unwrap_or(fallback_saved_at),
            synced: true,
        }
    }
}

impl From<&Bookmark> for RemoteBookmark {
    fn from(bookmark: &Bookmark) -> Self {
        Self {
            job_id: bookmark.job_id,
            title: Some(bookmark.title.clone()),
            company_name: bookmark.company_name.clone(),
            min_salary: bookmark.min_salary,
            max_salary: bookmark.max_salary,
            currency: bookmark.currency.clone(),
            city: bookmark.city.clone(),
            country: bookmark.country.clone(),
            location_type: bookmark.location_type.clone(),
            employment_type: bookmark.employment_type.clone(),
            saved_at: Some(bookmark.saved_at),
        }
    }
}

/// Operations against the remote bookmark store
#[async_trait]
pub trait RemoteBookmarks: Send + Sync {
    /// `GET /bookmarks`
    async fn list(&self) -> RemoteOutcome<Vec<RemoteBookmark>>;

    /// `POST /bookmarks {jobId}`; an already-existing bookmark is a success.
    async fn create(&self, job_id: JobId) -> RemoteOutcome<()>;

    /// `DELETE /bookmarks/{jobId}`
    async fn remove(&self, job_id: JobId) -> RemoteOutcome<()>;
}

/// Remote used when no API is configured: the client runs local-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRemote;

#[async_trait]
impl RemoteBookmarks for DisabledRemote {
    async fn list(&self) -> RemoteOutcome<Vec<RemoteBookmark>> {
        RemoteOutcome::EndpointUnavailable
    }

    async fn create(&self, _job_id: JobId) -> RemoteOutcome<()> {
        RemoteOutcome::EndpointUnavailable
    }

    async fn remove(&self, _job_id: JobId) -> RemoteOutcome<()> {
        RemoteOutcome::EndpointUnavailable
    }
}
