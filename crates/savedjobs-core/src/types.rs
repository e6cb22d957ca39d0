//! Core types for Saved Jobs

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod collection;

pub use collection::BookmarkCollection;

/// Identifier of a job listing
///
/// Unique within one user's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for JobId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the signed-in user, as supplied by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage namespace holding one user's collection
///
/// Derived from the active user id. When no identity can be resolved the
/// client falls back to a shared anonymous partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKey {
    User(UserId),
    Anonymous,
}

impl PartitionKey {
    const STORAGE_PREFIX: &'static str = "saved_jobs/";
    const USER_PREFIX: &'static str = "user:";
    const ANONYMOUS: &'static str = "anonymous";

    /// Partition for an optional user; blank ids map to the anonymous partition.
    pub fn for_user(user: Option<&UserId>) -> Self {
        match user {
            Some(id) if !id.as_str().trim().is_empty() => Self::User(id.clone()),
            _ => Self::Anonymous,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Stable key under which the collection is persisted.
    pub fn storage_key(&self) -> String {
        format!("{}{}", Self::STORAGE_PREFIX, self)
    }

    /// Inverse of [`storage_key`](Self::storage_key).
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let name = key.strip_prefix(Self::STORAGE_PREFIX)?;
        if name == Self::ANONYMOUS {
            return Some(Self::Anonymous);
        }
        let user = name.strip_prefix(Self::USER_PREFIX)?;
        if user.is_empty() {
            return None;
        }
        Some(Self::User(UserId::new(user)))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}{}", Self::USER_PREFIX, id),
            Self::Anonymous => f.write_str(Self::ANONYMOUS),
        }
    }
}

/// A job the user has saved
///
/// The descriptive fields are a snapshot taken at save time so the bookmark
/// can be rendered offline even if the listing later changes upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub job_id: JobId,
    pub title: String,
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
    /// Earliest known moment the user saved this job
    pub saved_at: DateTime<Utc>,
    /// Whether the remote store is known to hold this bookmark
    #[serde(default)]
    pub synced: bool,
}

impl Bookmark {
    /// Create an unsynced bookmark saved now.
    pub fn new(job_id: impl Into<JobId>, title: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            company_name: None,
            min_salary: None,
            max_salary: None,
            currency: None,
            city: None,
            country: None,
            location_type: None,
            employment_type: None,
            saved_at: Utc::now(),
            synced: false,
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company_name = Some(company.into());
        self
    }

    pub fn with_salary(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_salary = min;
        self.max_salary = max;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_location(mut self, city: Option<String>, country: Option<String>) -> Self {
        self.city = city;
        self.country = country;
        self
    }

    pub fn with_location_type(mut self, location_type: impl Into<String>) -> Self {
        self.location_type = Some(location_type.into());
        self
    }

    pub fn with_employment_type(mut self, employment_type: impl Into<String>) -> Self {
        self.employment_type = Some(employment_type.into());
        self
    }

    pub fn with_saved_at(mut self, saved_at: DateTime<Utc>) -> Self {
        self.saved_at = saved_at;
        self
    }
}
