//! Integration tests for `PersistedTokenStore`
//!
//! Covers what the session manager relies on: one session per namespace,
//! stale entries never loading, and clearing from any state.

#![cfg(feature = "runtime")]

use std::sync::Arc;

use mentorhub_common::auth::{
    MemorySecretStore, PersistedTokenStore, SecretBackend, StoreError, TokenStore,
};
use mentorhub_domain::{Environment, Session, SessionOrigin, UserClaims};

fn session(access: &str, expires_in: i64) -> Session {
    Session::new(
        access,
        format!("{access}-refresh"),
        expires_in,
        Some("sess-1".into()),
        UserClaims::new("u-1", "u1@example.com").with_role("mentor").with_full_name("Una"),
    )
}

fn store_on(
    backend: &Arc<MemorySecretStore>,
    namespace: &str,
    refresh_ttl_secs: i64,
) -> PersistedTokenStore<Arc<MemorySecretStore>> {
    PersistedTokenStore::new(
        Arc::clone(backend),
        namespace,
        Environment::Development.storage_attributes(),
        refresh_ttl_secs,
    )
}

#[tokio::test]
async fn save_replaces_previous_session() {
    let backend = Arc::new(MemorySecretStore::new());
    let store = store_on(&backend, "app", 3600);

    store.save(&session("first", 3600)).await.unwrap();
    store.save(&session("second", 3600)).await.unwrap();

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.access_token, "second");
    assert_eq!(loaded.refresh_token, "second-refresh");
    assert_eq!(backend.len(), 3);
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let backend = Arc::new(MemorySecretStore::new());
    let mentors = store_on(&backend, "mentor-app", 3600);
    let reports = store_on(&backend, "reports-app", 3600);

    mentors.save(&session("m", 3600)).await.unwrap();
    assert_eq!(reports.load().await.unwrap(), None);

    reports.clear().await.unwrap();
    assert!(mentors.load().await.unwrap().is_some());
}

/// Validates `PersistedTokenStore::load` behavior for the expired refresh
/// lifetime scenario.
///
/// Assertions:
/// - A session whose refresh entry has outlived its lifetime does not load,
///   even though the access token is still valid.
#[tokio::test]
async fn expired_refresh_entry_blocks_load() {
    let backend = Arc::new(MemorySecretStore::new());
    let store = store_on(&backend, "app", 0);

    store.save(&session("at", 3600)).await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn local_origin_survives_persistence() {
    let backend = Arc::new(MemorySecretStore::new());
    let store = store_on(&backend, "app", 3600);
    let saved = session("at", 3600).with_origin(SessionOrigin::Local);

    store.save(&saved).await.unwrap();
    assert_eq!(store.load().await.unwrap().map(|s| s.origin), Some(SessionOrigin::Local));
}

#[tokio::test]
async fn corrupt_entry_is_a_serialization_error() {
    let backend = Arc::new(MemorySecretStore::new());
    let store = store_on(&backend, "app", 3600);
    store.save(&session("at", 3600)).await.unwrap();

    backend.set_secret("access.app", "{not json").unwrap();
    assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));

    store.clear().await.unwrap();
    assert!(backend.is_empty());
}
