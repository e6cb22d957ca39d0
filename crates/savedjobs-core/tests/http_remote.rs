//! Integration tests for `HttpRemote` using wiremock.
//!
//! These tests verify request shapes and the classification of every
//! response class into a `RemoteOutcome`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use savedjobs_core::{
    Bookmark, BookmarkService, HttpRemote, JobId, MemoryStore, Propagation, RemoteBookmark,
    RemoteBookmarks, RemoteConfig, RemoteOutcome, StaticIdentity,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn remote_for(server: &MockServer) -> HttpRemote {
    let config = RemoteConfig::new(server.uri()).with_timeout(Duration::from_secs(2));
    HttpRemote::new(&config).unwrap()
}

fn listing(outcome: RemoteOutcome<Vec<RemoteBookmark>>) -> Vec<RemoteBookmark> {
    match outcome {
        RemoteOutcome::Success(listing) => listing,
        other => panic!("expected a listing, got {}", other),
    }
}

async fn mount_list(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/bookmarks"))
        .respond_with(response)
        .mount(server)
        .await;
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_bare_array() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            {"jobId": 1, "title": "Backend", "companyName": "Acme", "savedAt": "2024-05-01T10:00:00Z"},
            {"jobId": 2}
        ])),
    )
    .await;

    let listing = listing(remote_for(&server).list().await);

    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].job_id, JobId(1));
    assert_eq!(listing[0].company_name.as_deref(), Some("Acme"));
    assert!(listing[0].saved_at.is_some());
    assert!(listing[1].title.is_none());
}

#[tokio::test]
async fn test_list_wrapped_object() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"bookmarks": [{"jobId": 9}]})),
    )
    .await;

    let listing = listing(remote_for(&server).list().await);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].job_id, JobId(9));
}

#[tokio::test]
async fn test_list_empty_body_is_empty_listing() {
    let server = MockServer::start().await;
    mount_list(&server, ResponseTemplate::new(200)).await;

    assert_eq!(remote_for(&server).list().await, RemoteOutcome::Success(vec![]));
}

#[tokio::test]
async fn test_list_not_found_is_endpoint_unavailable() {
    let server = MockServer::start().await;
    mount_list(&server, ResponseTemplate::new(404)).await;

    assert_eq!(remote_for(&server).list().await, RemoteOutcome::EndpointUnavailable);
}

#[tokio::test]
async fn test_list_server_error_is_transient() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        ResponseTemplate::new(500).set_body_string("Internal Server Error"),
    )
    .await;

    let outcome = remote_for(&server).list().await;
    assert!(matches!(outcome, RemoteOutcome::TransientFailure(reason) if reason.contains("500")));
}

#[tokio::test]
async fn test_list_rate_limited_is_transient() {
    let server = MockServer::start().await;
    mount_list(&server, ResponseTemplate::new(429)).await;

    assert!(matches!(
        remote_for(&server).list().await,
        RemoteOutcome::TransientFailure(_)
    ));
}

#[tokio::test]
async fn test_list_auth_failures_are_unauthorized() {
    for status in [401, 403] {
        let server = MockServer::start().await;
        mount_list(&server, ResponseTemplate::new(status)).await;

        assert_eq!(remote_for(&server).list().await, RemoteOutcome::Unauthorized);
    }
}

#[tokio::test]
async fn test_list_undecodable_body_is_transient() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let outcome = remote_for(&server).list().await;
    assert!(matches!(outcome, RemoteOutcome::TransientFailure(reason) if reason.contains("undecodable")));
}

#[tokio::test]
async fn test_list_timeout_is_transient() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!([]))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let config = RemoteConfig::new(server.uri()).with_timeout(Duration::from_millis(200));
    let remote = HttpRemote::new(&config).unwrap();

    assert!(matches!(remote.list().await, RemoteOutcome::TransientFailure(_)));
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let config = RemoteConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(1));
    let remote = HttpRemote::new(&config).unwrap();

    assert!(matches!(remote.list().await, RemoteOutcome::TransientFailure(_)));
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_create_sends_job_id_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookmarks"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({"jobId": 42})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = RemoteConfig::new(server.uri()).with_token("secret-token");
    let remote = HttpRemote::new(&config).unwrap();

    assert_eq!(remote.create(JobId(42)).await, RemoteOutcome::Success(()));
}

#[tokio::test]
async fn test_create_conflict_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookmarks"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    assert_eq!(remote_for(&server).create(JobId(1)).await, RemoteOutcome::Success(()));
}

#[tokio::test]
async fn test_remove_targets_job_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/bookmarks/17"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(remote_for(&server).remove(JobId(17)).await, RemoteOutcome::Success(()));
}

#[tokio::test]
async fn test_remove_without_route_is_endpoint_unavailable() {
    let server = MockServer::start().await;

    assert_eq!(
        remote_for(&server).remove(JobId(17)).await,
        RemoteOutcome::EndpointUnavailable
    );
}

// =============================================================================
// Facade over HTTP
// =============================================================================

#[tokio::test]
async fn test_service_against_missing_feature_stays_local() {
    // No routes mounted: every request is a 404.
    let server = MockServer::start().await;
    let service = BookmarkService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(remote_for(&server)),
        Arc::new(StaticIdentity::user("ana")),
    );

    assert_eq!(
        service.save(Bookmark::new(5, "Data engineer")).await.unwrap(),
        Propagation::LocalOnly
    );
    let report = service.sync().await.unwrap();
    assert!(report.is_local_only());
    assert!(service.is_saved(JobId(5)).await.unwrap());
}

#[tokio::test]
async fn test_service_pushes_offline_save_once_endpoint_exists() {
    let server = MockServer::start().await;
    mount_list(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;
    Mock::given(method("POST"))
        .and(path("/bookmarks"))
        .and(body_json(json!({"jobId": 42})))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bookmarks"))
        .and(body_json(json!({"jobId": 42})))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let service = BookmarkService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(remote_for(&server)),
        Arc::new(StaticIdentity::user("ana")),
    );

    assert!(service.save(Bookmark::new(42, "SRE")).await.unwrap().is_deferred());
    let report = service.sync().await.unwrap();
    assert_eq!(report.pushed, vec![JobId(42)]);
    assert!(service.list().await.unwrap()[0].synced);
}
