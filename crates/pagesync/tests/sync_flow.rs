//! End-to-end runs through the public API.
//!
//! A scripted provider stands in for the source and `MemoryPageService` for
//! the wiki; configs live in the in-memory SQLite store.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pagesync::connect_and_migrate;
use pagesync::source::{
    ContentItem, ContentStream, InvalidConfig, ItemFetchError, MIME_MARKDOWN, ProviderRegistry,
    SourceError, SourceProvider,
};
use pagesync::store::{DbConfigStore, SyncConfigStore};
use pagesync::sync::{
    DeleteScope, ItemErrorKind, SyncError, SyncOptions, SyncOrchestrator, SyncProgress,
};
use pagesync::sync_config::{Credentials, NewSyncConfig, SyncConfig, TargetConfig};
use pagesync::target::{MemoryPageService, PageService};
use serde_json::json;

/// Maximum time a run should take in tests.
const RUN_TIMEOUT: Duration = Duration::from_secs(10);

const SPACE: &str = "space-docs";

/// Serves whatever documents the test puts in it.
#[derive(Default)]
struct ScriptedRepo {
    documents: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedRepo {
    fn set(&self, documents: &[(&str, Option<&str>)]) {
        *self.documents.lock().unwrap() = documents
            .iter()
            .map(|(name, body)| (name.to_string(), body.map(str::to_string)))
            .collect();
    }
}

#[async_trait]
impl SourceProvider for ScriptedRepo {
    fn name(&self) -> &str {
        "scripted"
    }

    fn validate_config(&self, config: &SyncConfig) -> Result<(), InvalidConfig> {
        config
            .source_str("repository")
            .map(|_| ())
            .ok_or(InvalidConfig::Missing { key: "repository" })
    }

    async fn fetch(&self, _config: &SyncConfig) -> Result<ContentStream, SourceError> {
        let items = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|(name, body)| match body {
                Some(body) => Ok(ContentItem::new(name.clone(), body.clone().into_bytes(), MIME_MARKDOWN)),
                None => Err(ItemFetchError {
                    name: name.clone(),
                    error: SourceError::unreachable("blob unavailable"),
                }),
            })
            .collect();
        Ok(ContentStream::from_items(items))
    }
}

struct Harness {
    repo: Arc<ScriptedRepo>,
    pages: Arc<MemoryPageService>,
    store: Arc<DbConfigStore>,
}

impl Harness {
    async fn new() -> Self {
        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Self {
            repo: Arc::new(ScriptedRepo::default()),
            pages: Arc::new(MemoryPageService::new()),
            store: Arc::new(DbConfigStore::new(db)),
        }
    }

    fn orchestrator(&self, options: SyncOptions) -> SyncOrchestrator {
        let registry = ProviderRegistry::new().with(Arc::clone(&self.repo) as Arc<dyn SourceProvider>);
        SyncOrchestrator::new(registry, Arc::clone(&self.pages) as Arc<dyn PageService>)
            .with_store(Arc::clone(&self.store) as Arc<dyn SyncConfigStore>)
            .with_options(options)
    }

    async fn create_config(&self) -> SyncConfig {
        self.store
            .create(NewSyncConfig {
                name: "Engineering handbook".into(),
                provider: "scripted".into(),
                enabled: true,
                schedule: String::new(),
                source_config: json!({"repository": "org/handbook"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                target_config: TargetConfig::new(SPACE),
                credentials: Credentials::new(),
            })
            .await
            .expect("create config")
    }
}

async fn run(sync: &SyncOrchestrator, config: &SyncConfig) -> Result<pagesync::SyncResult, SyncError> {
    tokio::time::timeout(RUN_TIMEOUT, sync.run(config))
        .await
        .expect("run timed out")
}

#[tokio::test]
async fn repeated_runs_converge_on_the_source_listing() {
    let harness = Harness::new().await;
    let config = harness.create_config().await;
    harness.pages.seed_page(SPACE, "legacy", Utc::now());
    harness
        .repo
        .set(&[("intro.md", Some("# Intro")), ("setup.md", Some("# Setup"))]);

    let sync = harness.orchestrator(SyncOptions::default());
    let first = run(&sync, &config).await.expect("first run");
    assert_eq!((first.imported_count, first.deleted_count), (2, 1));
    assert_eq!(harness.pages.titles(SPACE), vec!["intro", "setup"]);

    harness.repo.set(&[("setup.md", Some("# Setup v2"))]);
    let config = harness.store.get(config.id).await.unwrap();
    let second = run(&sync, &config).await.expect("second run");
    assert_eq!((second.imported_count, second.deleted_count), (1, 2));
    assert_eq!(harness.pages.titles(SPACE), vec!["setup"]);

    let stored = harness.store.get(config.id).await.unwrap();
    assert!(stored.last_sync.is_some());
    assert_eq!(stored.synced_pages, harness.pages.page_ids(SPACE));
}

#[tokio::test]
async fn synced_pages_scope_spares_hand_written_pages() {
    let harness = Harness::new().await;
    let config = harness.create_config().await;
    harness.repo.set(&[("intro.md", Some("# Intro"))]);

    let sync = harness.orchestrator(SyncOptions {
        delete_scope: DeleteScope::SyncedPages,
        ..Default::default()
    });
    run(&sync, &config).await.expect("first run");
    harness.pages.seed_page(SPACE, "notes", Utc::now());

    let config = harness.store.get(config.id).await.unwrap();
    let second = run(&sync, &config).await.expect("second run");

    assert_eq!(second.deleted_count, 1);
    assert_eq!(harness.pages.titles(SPACE), vec!["intro", "notes"]);
}

#[tokio::test]
async fn item_failures_do_not_stop_the_run() {
    let harness = Harness::new().await;
    let config = harness.create_config().await;
    harness
        .repo
        .set(&[("a.md", Some("# A")), ("b.md", None), ("c.md", Some("# C"))]);
    harness.pages.fail_import("c.md");

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let sync = harness
        .orchestrator(SyncOptions::default())
        .with_progress(Box::new(move |event| sink.lock().unwrap().push(event)));

    let result = run(&sync, &config).await.expect("run");

    assert_eq!(result.imported_count, 1);
    let failures: Vec<(&str, ItemErrorKind)> = result
        .item_errors
        .iter()
        .map(|e| (e.item.as_str(), e.kind))
        .collect();
    assert_eq!(
        failures,
        vec![("b.md", ItemErrorKind::ImportFailed), ("c.md", ItemErrorKind::ImportFailed)]
    );

    let events = events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(SyncProgress::SyncComplete {
            imported: 1,
            deleted: 0,
            errors: 2
        })
    ));
}

#[tokio::test]
async fn invalid_config_never_reaches_the_target() {
    let harness = Harness::new().await;
    let mut config = harness.create_config().await;
    config.source_config.clear();

    let sync = harness.orchestrator(SyncOptions::default());
    let err = run(&sync, &config).await.expect_err("invalid");

    assert!(matches!(err, SyncError::ConfigInvalid { .. }));
    assert!(harness.pages.calls().is_empty());
    assert!(harness.store.get(config.id).await.unwrap().last_sync.is_none());
}

#[tokio::test]
async fn preview_reports_what_would_be_imported() {
    let harness = Harness::new().await;
    let config = harness.create_config().await;
    harness
        .repo
        .set(&[("intro.md", Some("# Intro")), ("setup.md", None)]);

    let names = harness
        .orchestrator(SyncOptions::default())
        .preview(&config)
        .await
        .expect("preview");

    assert_eq!(names, vec!["intro.md", "setup.md"]);
    assert!(harness.pages.calls().is_empty());
}
