//! Tests for session synchronization and catalog loading.
//!
//! These use mock servers end-to-end: the manager drives a real
//! `CollectorClient` against wiremock.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use collector_client::{ClientConfig, CollectorClient};
use collector_core::types::{CollectionId, ExportFormat};
use collector_session::{
    AuthCompletion, AuthMessage, AuthState, CompletionStore, LoginEntry, SessionConfig,
    SessionManager,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn valid_jwt() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + 3600;
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}

fn manager_for(
    server: &MockServer,
    dir: &TempDir,
    config: SessionConfig,
) -> (Arc<CollectorClient>, SessionManager) {
    let client_config = ClientConfig::new(server.uri(), dir.path().join("token"));
    let client = Arc::new(CollectorClient::new(client_config).unwrap());
    let manager = SessionManager::new(Arc::clone(&client), config);
    (client, manager)
}

fn no_prefetch() -> SessionConfig {
    SessionConfig {
        prefetch_tracks: false,
        ..SessionConfig::default()
    }
}

async fn mount_status(server: &MockServer, authenticated: bool) {
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"authenticated": authenticated})),
        )
        .mount(server)
        .await;
}

async fn mount_playlists(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_tracks(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/playlists/{id}/tracks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn status_request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/status")
        .count()
}

// =============================================================================
// Entry Protocol Tests
// =============================================================================

#[tokio::test]
async fn synchronize_with_authenticated_status_loads_catalog() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({
            "playlists": [{"id": "pl1", "name": "Mix"}],
            "quota": {"apiCalls": 1, "apiLimit": 100, "downloads": 0, "downloadLimit": 5, "downloadedTracks": 0}
        }),
    )
    .await;
    mount_tracks(
        &server,
        "pl1",
        serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, SessionConfig::default());

    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(manager.catalog().collections().len(), 1);
    // Prefetch-all fetched the track list eagerly.
    assert!(manager.catalog().is_loaded(&CollectionId::from("pl1")));
    assert!(manager.last_error().is_none());
}

#[tokio::test]
async fn entry_protocol_runs_at_most_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"authenticated": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager.synchronize(LoginEntry::None).await;
    // Double invocation of setup logic must not re-run the protocol.
    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(status_request_count(&server).await, 1);
}

#[tokio::test]
async fn callback_code_exchanges_and_authenticates() {
    let server = MockServer::start().await;
    let token = valid_jwt();

    Mock::given(method("POST"))
        .and(path("/auth/exchange"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": token})),
        )
        .mount(&server)
        .await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager
        .synchronize(LoginEntry::RedirectCallback {
            code: Some("abc".to_string()),
            error: None,
        })
        .await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(client.token_store().token(), Some(token));
    // The code exchange is authoritative; no status round-trip.
    assert_eq!(status_request_count(&server).await, 0);
}

#[tokio::test]
async fn callback_error_lands_unauthenticated_without_requests() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager
        .synchronize(LoginEntry::RedirectCallback {
            code: None,
            error: Some("access_denied".to_string()),
        })
        .await;

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(manager.last_error().unwrap().contains("access_denied"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn completion_record_is_consumed_at_startup() {
    let server = MockServer::start().await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let store = CompletionStore::new(dir.path());
    let token = valid_jwt();
    store.write(&AuthCompletion::success(&token)).unwrap();

    let config = SessionConfig {
        prefetch_tracks: false,
        completion_store: Some(store.clone()),
        ..SessionConfig::default()
    };
    let (client, mut manager) = manager_for(&server, &dir, config);

    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(client.token_store().token(), Some(token));
    // Processed once, then deleted; no status check was needed.
    assert!(!store.path().exists());
    assert_eq!(status_request_count(&server).await, 0);
}

#[tokio::test]
async fn stale_completion_record_falls_back_to_status_check() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let store = CompletionStore::new(dir.path());
    let stale = AuthCompletion {
        timestamp: chrono::Utc::now().timestamp_millis() - 60_000,
        ..AuthCompletion::success(valid_jwt())
    };
    store.write(&stale).unwrap();

    let config = SessionConfig {
        prefetch_tracks: false,
        completion_store: Some(store.clone()),
        ..SessionConfig::default()
    };
    let (client, mut manager) = manager_for(&server, &dir, config);

    manager.synchronize(LoginEntry::None).await;

    // Stale record deleted unprocessed; the status check decided instead.
    assert!(!store.path().exists());
    assert!(client.token_store().token().is_none());
    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(status_request_count(&server).await, 1);
}

#[tokio::test]
async fn failed_completion_surfaces_delivered_error() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager
        .synchronize(LoginEntry::Completion(AuthCompletion::failure(
            "user closed the window",
        )))
        .await;

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(manager
        .last_error()
        .unwrap()
        .contains("user closed the window"));
}

// =============================================================================
// Login Retry Backoff Tests
// =============================================================================

#[tokio::test]
async fn status_retries_settle_authenticated_on_fourth_attempt() {
    let server = MockServer::start().await;

    // Three "not yet" answers, then success. The retry schedule must make
    // exactly four attempts, 1s + 2s + 3s apart.
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"authenticated": false})),
        )
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"authenticated": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    let started = Instant::now();
    manager.synchronize(LoginEntry::None).await;
    let elapsed = started.elapsed();

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(status_request_count(&server).await, 4);
    assert!(elapsed >= Duration::from_secs(6), "elapsed: {elapsed:?}");
}

#[tokio::test]
async fn status_retries_give_up_after_fourth_attempt() {
    let server = MockServer::start().await;
    mount_status(&server, false).await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    // Never a fifth attempt.
    assert_eq!(status_request_count(&server).await, 4);
}

// =============================================================================
// Completion Message Origin Tests
// =============================================================================

#[tokio::test]
async fn untrusted_origin_message_is_ignored() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager
        .handle_message(AuthMessage {
            origin: "https://evil.example.com".to_string(),
            completion: AuthCompletion::success(valid_jwt()),
        })
        .await;

    assert_eq!(manager.state(), AuthState::Unknown);
    assert!(client.token_store().token().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn trusted_origin_message_completes_login() {
    let server = MockServer::start().await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, no_prefetch());

    let token = valid_jwt();
    manager
        .handle_message(AuthMessage {
            origin: server.uri(),
            completion: AuthCompletion::success(&token),
        })
        .await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(client.token_store().token(), Some(token));
}

// =============================================================================
// Catalog Loading Tests
// =============================================================================

#[tokio::test]
async fn tracks_are_fetched_at_most_once_per_collection() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [{"id": "pl1", "name": "Mix"}]}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/playlists/pl1/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());
    manager.synchronize(LoginEntry::None).await;

    let id = CollectionId::from("pl1");
    manager.load_tracks(&id).await;
    manager.load_tracks(&id).await;
    manager.load_tracks(&id).await;

    assert!(manager.catalog().is_loaded(&id));
    // The expect(1) on the mock verifies a single network call on drop.
}

#[tokio::test]
async fn prefetch_loads_every_collection_concurrently() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [
            {"id": "pl1", "name": "First"},
            {"id": "pl2", "name": "Second"}
        ]}),
    )
    .await;
    // The first collection answers slowly so results arrive out of order.
    Mock::given(method("GET"))
        .and(path("/api/playlists/pl1/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(
                    serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(
        &server,
        "pl2",
        serde_json::json!({"tracks": [{"id": "t2", "title": "Two", "artists": ["B"]}]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, SessionConfig::default());

    manager.synchronize(LoginEntry::None).await;

    assert!(manager.catalog().is_loaded(&CollectionId::from("pl1")));
    assert!(manager.catalog().is_loaded(&CollectionId::from("pl2")));
    assert!(!manager.catalog().any_loading());
}

#[tokio::test]
async fn selection_sweeps_tracks_that_arrive_after_selection() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [
            {"id": "pl1", "name": "First"},
            {"id": "pl2", "name": "Second"}
        ]}),
    )
    .await;
    // Reverse arrival relative to selection order: pl1 lands last.
    Mock::given(method("GET"))
        .and(path("/api/playlists/pl1/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(
                    serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
                ),
        )
        .mount(&server)
        .await;
    mount_tracks(
        &server,
        "pl2",
        serde_json::json!({"tracks": [
            {"id": "t2", "title": "Two", "artists": ["B"]},
            {"id": "t3", "title": "Three", "artists": ["C"]}
        ]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());
    manager.synchronize(LoginEntry::None).await;

    // Selecting everything before any tracks are loaded fetches and then
    // sweeps each list as it arrives.
    manager.select_all_collections(true).await;

    let snapshot = manager.export_snapshot();
    assert_eq!(snapshot.len(), 2);
    let pl1 = snapshot
        .iter()
        .find(|e| e.playlist_id == CollectionId::from("pl1"))
        .unwrap();
    assert_eq!(pl1.track_ids.len(), 1);
    let pl2 = snapshot
        .iter()
        .find(|e| e.playlist_id == CollectionId::from("pl2"))
        .unwrap();
    assert_eq!(pl2.track_ids.len(), 2);
}

#[tokio::test]
async fn quota_mirrors_the_most_recent_response() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({
            "playlists": [{"id": "pl1", "name": "Mix"}, {"id": "pl2", "name": "Other"}],
            "quota": {"apiCalls": 1, "apiLimit": 100, "downloads": 0, "downloadLimit": 5, "downloadedTracks": 0}
        }),
    )
    .await;
    mount_tracks(
        &server,
        "pl1",
        serde_json::json!({
            "tracks": [],
            "quota": {"apiCalls": 2, "apiLimit": 100, "downloads": 0, "downloadLimit": 5, "downloadedTracks": 0}
        }),
    )
    .await;
    mount_tracks(&server, "pl2", serde_json::json!({"tracks": []})).await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());
    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.catalog().quota().unwrap().api_calls, 1);

    manager.load_tracks(&CollectionId::from("pl1")).await;
    assert_eq!(manager.catalog().quota().unwrap().api_calls, 2);

    // A response without a quota snapshot overwrites wholesale with none.
    manager.load_tracks(&CollectionId::from("pl2")).await;
    assert!(manager.catalog().quota().is_none());
}

#[tokio::test]
async fn collections_401_deauthenticates_and_clears_state() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;

    Mock::given(method("GET"))
        .and(path("/api/playlists"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, no_prefetch());
    client.token_store().set_token(&valid_jwt()).unwrap();

    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(manager.last_error().unwrap().contains("Session expired"));
    assert!(manager.catalog().collections().is_empty());
    assert!(client.token_store().token().is_none());
}

#[tokio::test]
async fn collections_rate_limit_keeps_session_authenticated() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;

    Mock::given(method("GET"))
        .and(path("/api/playlists"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": "Daily API limit reached",
            "resetTime": "Resets at midnight UTC"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager.synchronize(LoginEntry::None).await;

    // Rate limiting is informational, never a deauthentication.
    assert_eq!(manager.state(), AuthState::Authenticated);
    let banner = manager.last_error().unwrap();
    assert!(banner.contains("Daily API limit reached"));
    assert!(banner.contains("Resets at midnight UTC"));
}

#[tokio::test]
async fn other_collections_failure_sets_generic_banner() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;

    Mock::given(method("GET"))
        .and(path("/api/playlists"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());

    manager.synchronize(LoginEntry::None).await;

    assert_eq!(manager.state(), AuthState::Authenticated);
    assert_eq!(manager.last_error(), Some("Failed to fetch playlists"));
}

// =============================================================================
// Export Tests
// =============================================================================

#[tokio::test]
async fn empty_selection_blocks_the_download_locally() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [{"id": "pl1", "name": "Mix"}]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, no_prefetch());
    manager.synchronize(LoginEntry::None).await;

    let result = manager.download(ExportFormat::Csv).await;

    assert!(result.is_err());
    assert!(manager.last_error().unwrap().contains("select at least one"));
    // No download request went out.
    assert!(server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .all(|r| r.url.path() != "/api/download"));
}

#[tokio::test]
async fn download_updates_quota_from_header() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [{"id": "pl1", "name": "Mix"}]}),
    )
    .await;
    mount_tracks(
        &server,
        "pl1",
        serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"data".to_vec())
                .insert_header(
                    "x-user-quota",
                    r#"{"apiCalls":9,"apiLimit":100,"downloads":1,"downloadLimit":5,"downloadedTracks":1}"#,
                ),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_client, mut manager) = manager_for(&server, &dir, SessionConfig::default());
    manager.synchronize(LoginEntry::None).await;
    manager.select_all_collections(true).await;

    let download = manager.download(ExportFormat::Csv).await.unwrap();

    assert_eq!(download.bytes, b"data");
    assert_eq!(manager.catalog().quota().unwrap().downloads, 1);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn logout_clears_credential_and_derived_state() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(
        &server,
        serde_json::json!({"playlists": [{"id": "pl1", "name": "Mix"}]}),
    )
    .await;
    mount_tracks(
        &server,
        "pl1",
        serde_json::json!({"tracks": [{"id": "t1", "title": "One", "artists": ["A"]}]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, SessionConfig::default());
    client.token_store().set_token(&valid_jwt()).unwrap();

    manager.synchronize(LoginEntry::None).await;
    manager.select_all_collections(true).await;
    assert!(!manager.export_snapshot().is_empty());

    manager.logout();

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(manager.catalog().collections().is_empty());
    assert!(manager.catalog().quota().is_none());
    assert!(manager.export_snapshot().is_empty());
    assert!(client.token_store().token().is_none());
}

#[tokio::test]
async fn transport_401_event_deauthenticates_the_session() {
    let server = MockServer::start().await;
    mount_status(&server, true).await;
    mount_playlists(&server, serde_json::json!({"playlists": []})).await;

    let dir = TempDir::new().unwrap();
    let (client, mut manager) = manager_for(&server, &dir, no_prefetch());
    manager.synchronize(LoginEntry::None).await;
    assert_eq!(manager.state(), AuthState::Authenticated);

    // Some other component's request hits a 401.
    Mock::given(method("GET"))
        .and(path("/api/albums"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let _ = client
        .catalog()
        .list_collections(collector_core::types::CollectionKind::Albums)
        .await;

    manager.absorb_auth_events();

    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(manager.last_error().unwrap().contains("Session expired"));
}
