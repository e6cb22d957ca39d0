//! HTTP implementation of [`RemoteBookmarks`] using reqwest.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{RemoteBookmark, RemoteBookmarks, RemoteOutcome};
use crate::config::RemoteConfig;
use crate::error::{BookmarkError, BookmarkResult};
use crate::types::JobId;

/// Longest response body excerpt kept in a failure reason
const MAX_BODY_EXCERPT: usize = 200;

/// `GET /bookmarks` may answer with a bare array or a wrapper object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Bare(Vec<RemoteBookmark>),
    Wrapped { bookmarks: Vec<RemoteBookmark> },
}

impl ListResponse {
    fn into_vec(self) -> Vec<RemoteBookmark> {
        match self {
            Self::Bare(list) | Self::Wrapped { bookmarks: list } => list,
        }
    }
}

/// Bookmarks API client
///
/// Authentication is a static bearer token taken from [`RemoteConfig`];
/// the timeout applies to every request and surfaces as a transient failure.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    bookmarks_url: String,
    bearer_token: Option<String>,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> BookmarkResult<Self> {
        let base = config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| BookmarkError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            bookmarks_url: format!("{}/bookmarks", base.as_str().trim_end_matches('/')),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Collection endpoint, e.g. `https://api.example.com/v1/bookmarks`.
    pub fn bookmarks_url(&self) -> &str {
        &self.bookmarks_url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and read the whole body. `Err` carries a transport failure reason.
    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String), String> {
        let response = builder.send().await.map_err(describe_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(describe_transport_error)?;
        Ok((status, body))
    }
}

fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Map a non-success status onto the outcome taxonomy.
fn classify_status<T>(status: StatusCode, body: &str) -> RemoteOutcome<T> {
    match status {
        StatusCode::NOT_FOUND => RemoteOutcome::EndpointUnavailable,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteOutcome::Unauthorized,
        _ => {
            let excerpt: String = body.chars().take(MAX_BODY_EXCERPT).collect();
            RemoteOutcome::TransientFailure(format!("HTTP {status}: {excerpt}"))
        }
    }
}

#[async_trait]
impl RemoteBookmarks for HttpRemote {
    async fn list(&self) -> RemoteOutcome<Vec<RemoteBookmark>> {
        let request = self.request(Method::GET, &self.bookmarks_url);
        let (status, body) = match self.send(request).await {
            Ok(response) => response,
            Err(reason) => return RemoteOutcome::TransientFailure(reason),
        };
        if !status.is_success() {
            debug!(%status, "Bookmark list request failed");
            return classify_status(status, &body);
        }
        if body.trim().is_empty() {
            return RemoteOutcome::Success(Vec::new());
        }

        match serde_json::from_str::<ListResponse>(&body) {
            Ok(list) => {
                let list = list.into_vec();
                debug!(count = list.len(), "Fetched remote bookmarks");
                RemoteOutcome::Success(list)
            }
            Err(e) => RemoteOutcome::TransientFailure(format!("undecodable bookmark list: {e}")),
        }
    }

    async fn create(&self, job_id: JobId) -> RemoteOutcome<()> {
        let request = self
            .request(Method::POST, &self.bookmarks_url)
            .json(&json!({ "jobId": job_id }));
        let (status, body) = match self.send(request).await {
            Ok(response) => response,
            Err(reason) => return RemoteOutcome::TransientFailure(reason),
        };

        // 409: the server already has it, which is the state we wanted.
        if status.is_success() || status == StatusCode::CONFLICT {
            debug!(%job_id, %status, "Created remote bookmark");
            RemoteOutcome::Success(())
        } else {
            debug!(%job_id, %status, "Remote create failed");
            classify_status(status, &body)
        }
    }

    async fn remove(&self, job_id: JobId) -> RemoteOutcome<()> {
        let url = format!("{}/{}", self.bookmarks_url, job_id);
        let request = self.request(Method::DELETE, &url);
        let (status, body) = match self.send(request).await {
            Ok(response) => response,
            Err(reason) => return RemoteOutcome::TransientFailure(reason),
        };

        if status.is_success() {
            debug!(%job_id, "Removed remote bookmark");
            RemoteOutcome::Success(())
        } else {
            debug!(%job_id, %status, "Remote remove failed");
            classify_status(status, &body)
        }
    }
}
