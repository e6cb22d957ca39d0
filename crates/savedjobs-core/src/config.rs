//! Configuration for the remote client and the bookmark service.

use std::time::Duration;

use reqwest::Url;

use crate::error::{BookmarkError, BookmarkResult};

/// Default per-request timeout for remote calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between background syncs
pub const DEFAULT_AUTO_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Connection settings for the bookmarks API
///
/// The base URL points at the API root; the client appends `/bookmarks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse and check the base URL.
    pub fn validate(&self) -> BookmarkResult<Url> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            BookmarkError::InvalidConfig(format!("invalid API url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BookmarkError::InvalidConfig(format!(
                "unsupported API url scheme '{}'",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(BookmarkError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(url)
    }
}

/// Behaviour knobs for [`BookmarkService`](crate::service::BookmarkService)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub auto_sync_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_sync_interval: DEFAULT_AUTO_SYNC_INTERVAL,
        }
    }
}

impl ServiceConfig {
    pub fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval = interval;
        self
    }
}
