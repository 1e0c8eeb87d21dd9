//! Integration tests for the database-backed config store.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled
//! and use an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{Duration, Utc};
use pagesync::store::{DbConfigStore, StoreError, SyncConfigStore};
use pagesync::sync_config::{
    ACCESS_TOKEN_KEY, ConfigValidationError, Credentials, MASKED_SECRET, NewSyncConfig,
    SyncConfigPatch, TargetConfig,
};
use pagesync::connect_and_migrate;
use serde_json::json;
use uuid::Uuid;

/// Create an in-memory SQLite database with migrations applied.
async fn setup_store() -> DbConfigStore {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    DbConfigStore::new(db)
}

fn new_config(name: &str, space_id: &str) -> NewSyncConfig {
    NewSyncConfig {
        name: name.to_string(),
        provider: "github".to_string(),
        enabled: true,
        schedule: String::new(),
        source_config: json!({"repository": "org/repo", "branch": "main", "path": "docs"})
            .as_object()
            .cloned()
            .unwrap(),
        target_config: TargetConfig::new(space_id),
        credentials: Credentials::new().with(ACCESS_TOKEN_KEY, "ghp_secret"),
    }
}

#[tokio::test]
async fn create_then_get_round_trips_every_field() {
    let store = setup_store().await;
    let mut input = new_config("Handbook", "space-1");
    input.schedule = "0 6 * * *".to_string();
    input.target_config.parent_page_id = Some("root-page".to_string());
    input.target_config.update_existing = false;

    let created = store.create(input).await.expect("create");
    let fetched = store.get(created.id).await.expect("get");

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, "Handbook");
    assert_eq!(fetched.schedule, "0 6 * * *");
    assert_eq!(fetched.source_str("repository"), Some("org/repo"));
    assert_eq!(fetched.target_config.parent_page_id.as_deref(), Some("root-page"));
    assert!(!fetched.target_config.update_existing);
    assert_eq!(fetched.credentials.get(ACCESS_TOKEN_KEY), Some("ghp_secret"));
    assert!(fetched.last_sync.is_none());
    assert!(fetched.synced_pages.is_empty());
}

#[tokio::test]
async fn credentials_are_masked_when_rendered() {
    let store = setup_store().await;
    let created = store.create(new_config("Docs", "space-1")).await.unwrap();
    let fetched = store.get(created.id).await.unwrap();

    let rendered = serde_json::to_string(&fetched).unwrap();
    assert!(!rendered.contains("ghp_secret"));
    assert!(rendered.contains(MASKED_SECRET));
    assert!(!format!("{fetched:?}").contains("ghp_secret"));
}

#[tokio::test]
async fn update_changes_only_patched_fields() {
    let store = setup_store().await;
    let created = store.create(new_config("Docs", "space-1")).await.unwrap();
    let at = Utc::now();
    store
        .record_run(created.id, at, &["page-1".to_string()])
        .await
        .unwrap();

    let updated = store
        .update(
            created.id,
            SyncConfigPatch {
                enabled: Some(false),
                schedule: Some("*/30 * * * *".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert!(!updated.enabled);
    assert_eq!(updated.schedule, "*/30 * * * *");
    assert_eq!(updated.name, "Docs");
    assert_eq!(updated.synced_pages, vec!["page-1"]);
    assert!(updated.last_sync.is_some());
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_writing() {
    let store = setup_store().await;

    let err = store.create(new_config("Docs", "")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Invalid(ConfigValidationError::Empty { field: "targetConfig.spaceId" })
    ));

    let mut bad_schedule = new_config("Docs", "space-1");
    bad_schedule.schedule = "every tuesday".to_string();
    assert!(matches!(
        store.create(bad_schedule).await.unwrap_err(),
        StoreError::Invalid(ConfigValidationError::Schedule { .. })
    ));

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn record_run_persists_last_sync_and_page_ids() {
    let store = setup_store().await;
    let created = store.create(new_config("Docs", "space-1")).await.unwrap();
    let at = Utc::now();

    store
        .record_run(created.id, at, &["page-7".to_string(), "page-8".to_string()])
        .await
        .expect("record_run");

    let fetched = store.get(created.id).await.unwrap();
    let last_sync = fetched.last_sync.expect("last_sync set");
    assert!((last_sync - at).abs() < Duration::milliseconds(1));
    assert_eq!(fetched.synced_pages, vec!["page-7", "page-8"]);

    let err = store.record_run(Uuid::new_v4(), at, &[]).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_resolve_and_delete() {
    let store = setup_store().await;
    let first = store.create(new_config("Alpha", "space-1")).await.unwrap();
    let second = store.create(new_config("Beta", "space-2")).await.unwrap();

    let names: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);

    let in_space = store.list_for_space("space-2").await.unwrap();
    assert_eq!(in_space.len(), 1);
    assert_eq!(in_space[0].id, second.id);

    assert_eq!(store.resolve("Alpha").await.unwrap().id, first.id);
    assert_eq!(store.resolve(&second.id.to_string()).await.unwrap().id, second.id);
    assert!(store.resolve("Gamma").await.unwrap_err().is_not_found());

    store.delete(first.id).await.expect("delete");
    assert!(store.get(first.id).await.unwrap_err().is_not_found());
    assert!(store.delete(first.id).await.unwrap_err().is_not_found());
}
