mod common;

use common::path;
use console_gate::{
    InMemorySessionStore, MockProfileClient, PermissionsStore, SessionStore, Signal,
    models::{PermissionsSnapshot, Principal, Role},
    route::{FallbackPriorityList, RouteRegistry},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// --- Helpers ---

fn signed_in_session() -> Arc<InMemorySessionStore> {
    let sessions = Arc::new(InMemorySessionStore::new());
    sessions.establish("token-1", Principal::new(Uuid::new_v4(), Role::SubAdmin), None);
    sessions
}

fn store(sessions: &Arc<InMemorySessionStore>, client: &MockProfileClient) -> PermissionsStore {
    PermissionsStore::new(sessions.clone(), Arc::new(client.clone()), RouteRegistry::default())
}

// --- load() ---

#[tokio::test]
async fn test_load_without_session_skips_network() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let client = MockProfileClient::with_routes(&["/users"]);
    let store = store(&sessions, &client);

    let snapshot = store.load().await;

    assert!(snapshot.authorized_prefixes.is_empty());
    assert!(!snapshot.is_loading);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_load_commits_allowed_routes() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users", "/payments"]);
    let store = store(&sessions, &client);

    let snapshot = store.load().await;

    assert_eq!(
        snapshot.authorized_prefixes.into_iter().collect::<Vec<_>>(),
        vec![path("/payments"), path("/users")]
    );
    assert!(!snapshot.is_loading);
    assert!(snapshot.loaded_at.is_some());
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_load_failure_degrades_to_empty_grants() {
    let sessions = signed_in_session();
    let client = MockProfileClient::new_failing();
    let store = store(&sessions, &client);

    let snapshot = store.load().await;

    assert!(snapshot.authorized_prefixes.is_empty());
    assert!(!snapshot.is_loading);
    // Losing permissions data must not end the session.
    assert!(sessions.principal().is_some());
}

#[tokio::test]
async fn test_load_treats_missing_or_malformed_field_as_empty() {
    let sessions = signed_in_session();

    for body in [
        json!({ "name": "Sam" }),
        json!({ "allowed_routes": "/users" }),
        json!({ "allowed_routes": null }),
    ] {
        let client = MockProfileClient::new(body);
        let snapshot = store(&sessions, &client).load().await;
        assert!(snapshot.authorized_prefixes.is_empty());
        assert!(!snapshot.is_loading);
    }
}

#[tokio::test]
async fn test_load_reads_data_envelope_and_drops_unknown_routes() {
    let sessions = signed_in_session();
    let client = MockProfileClient::new(json!({
        "data": { "allowed_routes": ["/pages/dog-breeds", "/admin-secrets", 42, "/dogs"] }
    }));

    let snapshot = store(&sessions, &client).load().await;

    assert_eq!(
        snapshot.authorized_prefixes.into_iter().collect::<Vec<_>>(),
        vec![path("/dogs"), path("/pages/dog-breeds")]
    );
}

#[tokio::test]
async fn test_priority_override_keeps_server_grants() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users", "/dogs", "/likes"]);
    let registry = RouteRegistry::for_console(&FallbackPriorityList::from_csv("/users,/dashboard"));
    let store = PermissionsStore::new(sessions.clone(), Arc::new(client), registry);

    let snapshot = store.load().await;

    assert_eq!(
        snapshot.authorized_prefixes.into_iter().collect::<Vec<_>>(),
        vec![path("/dogs"), path("/likes"), path("/users")]
    );
}

#[tokio::test]
async fn test_stale_response_after_logout_is_discarded() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users"]).delayed(Duration::from_millis(100));
    let store = Arc::new(store(&sessions, &client));

    let in_flight = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    sessions.clear();
    store.notify(Signal::SessionEnded);

    in_flight.await.unwrap();

    let snapshot = store.snapshot();
    assert!(snapshot.authorized_prefixes.is_empty());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_session_expiring_mid_fetch_settles_empty() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let expires_at = chrono::Utc::now() + chrono::Duration::milliseconds(50);
    sessions.establish("token-1", Principal::new(Uuid::new_v4(), Role::SubAdmin), Some(expires_at));
    let client = MockProfileClient::with_routes(&["/users"]).delayed(Duration::from_millis(150));
    let store = store(&sessions, &client);

    let snapshot = store.load().await;

    assert!(snapshot.authorized_prefixes.is_empty());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_concurrent_refreshes_settle_consistently() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/faqs"]).delayed(Duration::from_millis(10));
    let store = store(&sessions, &client);

    let (first, second) = tokio::join!(store.refresh(), store.refresh());

    let settled = store.snapshot();
    assert!(!settled.is_loading);
    assert_eq!(settled.authorized_prefixes.len(), 1);
    // The superseded caller still gets the settled result.
    assert_eq!(first, settled);
    assert_eq!(second, settled);
    assert_eq!(client.call_count(), 2);
}

// --- Signals ---

#[tokio::test]
async fn test_session_established_marks_loading_immediately() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users"]);
    let store = store(&sessions, &client);
    store.load().await;

    store.notify(Signal::SessionEstablished);

    let snapshot = store.snapshot();
    assert!(snapshot.is_loading);
    // Grants from before the login are not carried over.
    assert!(snapshot.authorized_prefixes.is_empty());
}

#[tokio::test]
async fn test_invalidation_keeps_grants_while_reloading() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users"]);
    let store = store(&sessions, &client);
    store.load().await;

    store.notify(Signal::PermissionsInvalidated);

    let snapshot = store.snapshot();
    assert!(snapshot.is_loading);
    assert!(snapshot.authorized_prefixes.contains(&path("/users")));
}

#[tokio::test]
async fn test_session_ended_resets_synchronously() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/users"]);
    let store = store(&sessions, &client);
    store.load().await;

    sessions.clear();
    store.notify(Signal::SessionEnded);

    assert_eq!(store.snapshot(), PermissionsSnapshot::empty());
}

#[tokio::test]
async fn test_worker_reloads_on_signal() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let client = MockProfileClient::with_routes(&["/dogs"]);
    let store = PermissionsStore::spawn(sessions.clone(), Arc::new(client.clone()), RouteRegistry::default());
    let mut updates = store.subscribe();

    sessions.establish("token-2", Principal::new(Uuid::new_v4(), Role::SubAdmin), None);
    store.notify(Signal::SessionEstablished);

    let snapshot = tokio::time::timeout(Duration::from_secs(1), store.ready())
        .await
        .expect("permissions never settled");
    assert!(snapshot.authorized_prefixes.contains(&path("/dogs")));
    assert_eq!(client.call_count(), 1);

    // Subscribers saw the replacement.
    assert!(updates.has_changed().unwrap());
    assert!(!updates.borrow_and_update().is_loading);
}

#[tokio::test]
async fn test_spawn_with_active_session_loads_immediately() {
    let sessions = signed_in_session();
    let client = MockProfileClient::with_routes(&["/likes"]);
    let store = PermissionsStore::spawn(sessions.clone(), Arc::new(client.clone()), RouteRegistry::default());

    assert!(store.snapshot().is_loading);

    let snapshot = tokio::time::timeout(Duration::from_secs(1), store.ready())
        .await
        .expect("permissions never settled");
    assert!(snapshot.authorized_prefixes.contains(&path("/likes")));
}
