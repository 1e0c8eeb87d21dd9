//! The sync orchestrator.
//!
//! A run replaces the content of a target space with the documents a source
//! provider lists:
//!
//! 1. resolve and validate the provider (no I/O),
//! 2. list the target space,
//! 3. delete the pages in scope, one at a time,
//! 4. fetch the source listing,
//! 5. import each document in listing order,
//! 6. record `last_sync` and the created page ids.
//!
//! Failures before step 4 completes end the run with a [`SyncError`]; any
//! single delete or import failure is recorded and the run continues.
//!
//! ```ignore
//! let registry = ProviderRegistry::new().with(Arc::new(GitHubProvider::new(settings)?));
//! let orchestrator = SyncOrchestrator::new(registry, Arc::new(docmost))
//!     .with_store(Arc::new(DbConfigStore::new(db)));
//! let result = orchestrator.run(&config).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;

use super::error::{ConfigProblem, SyncError};
use super::lock::RunLocks;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{DeleteScope, ItemError, PartialProgress, SyncOptions, SyncResult};
use crate::source::{
    ContentStream, ProviderRegistry, SourceError, SourceProvider, short_error_message,
};
use crate::store::SyncConfigStore;
use crate::sync_config::SyncConfig;
use crate::target::{PageService, RecentChange, TargetError};

/// Runs sync configs against one page service.
pub struct SyncOrchestrator {
    registry: ProviderRegistry,
    pages: Arc<dyn PageService>,
    store: Option<Arc<dyn SyncConfigStore>>,
    options: SyncOptions,
    locks: RunLocks,
    on_progress: Option<ProgressCallback>,
}

impl SyncOrchestrator {
    pub fn new(registry: ProviderRegistry, pages: Arc<dyn PageService>) -> Self {
        Self {
            registry,
            pages,
            store: None,
            options: SyncOptions::default(),
            locks: RunLocks::new(),
            on_progress: None,
        }
    }

    /// Write `last_sync` back through `store` after each run.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SyncConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Share run locks with another orchestrator.
    #[must_use]
    pub fn with_locks(mut self, locks: RunLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    #[must_use]
    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    /// Run `config` to completion.
    pub async fn run(&self, config: &SyncConfig) -> Result<SyncResult, SyncError> {
        let never = AtomicBool::new(false);
        self.run_with_shutdown(config, &never).await
    }

    /// Run `config`, stopping at the next item boundary once `shutdown` is set.
    ///
    /// A cancelled run returns its partial result with `cancelled = true`.
    pub async fn run_with_shutdown(
        &self,
        config: &SyncConfig,
        shutdown: &AtomicBool,
    ) -> Result<SyncResult, SyncError> {
        if !config.enabled {
            return Err(SyncError::Disabled {
                config_id: config.id,
            });
        }

        let _guard = self
            .locks
            .acquire(config.id, self.options.lock_policy)
            .await
            .ok_or(SyncError::AlreadyRunning {
                config_id: config.id,
            })?;

        let provider = self.resolve_provider(config)?;
        let space_id = config.target_config.space_id.as_str();
        let mut result = SyncResult::new(config.id);

        tracing::info!(
            config = %config.name,
            provider = provider.name(),
            space_id,
            "Starting sync"
        );

        // Step 2: list the target before touching it.
        emit(
            self.progress(),
            SyncProgress::ListingTarget {
                config: config.name.clone(),
                space_id: space_id.to_string(),
            },
        );
        let existing = self
            .bounded(self.pages.list_recent_changes(space_id), |t| {
                TargetError::unavailable(format!("listing timed out after {t:?}"))
            })
            .await
            .map_err(|error| SyncError::Target { error })?;
        emit(
            self.progress(),
            SyncProgress::TargetListed {
                space_id: space_id.to_string(),
                pages: existing.len(),
            },
        );

        // Step 3: clear the pages in scope.
        if config.target_config.update_existing {
            let doomed = self.pages_in_scope(config, existing);
            if self.delete_pages(&doomed, shutdown, &mut result).await {
                return Ok(self.finish_cancelled(result, 0));
            }
        } else {
            tracing::debug!(config = %config.name, "Append mode, skipping deletes");
        }

        // Step 4: fetch the source listing.
        emit(
            self.progress(),
            SyncProgress::FetchingSource {
                provider: provider.name().to_string(),
            },
        );
        let mut stream = match self
            .bounded(provider.fetch(config), |t| {
                SourceError::unreachable(format!("source listing timed out after {t:?}"))
            })
            .await
        {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(config = %config.name, "Source fetch failed: {}", error);
                return Err(SyncError::Source {
                    error,
                    partial: PartialProgress {
                        deleted_count: result.deleted_count,
                        item_errors: result.item_errors,
                    },
                });
            }
        };
        emit(
            self.progress(),
            SyncProgress::SourceListed {
                count: stream.remaining(),
            },
        );

        // Steps 5-6: import in listing order.
        self.import_items(config, &mut stream, shutdown, &mut result)
            .await;

        // Step 7: the source listing succeeded, so the run counts as a sync.
        let now = Utc::now();
        result.last_sync = Some(now);
        if let Some(store) = &self.store {
            let page_ids: Vec<String> = result.imported_pages.iter().map(|p| p.id.clone()).collect();
            let write_back = tokio::time::timeout(
                self.options.call_timeout,
                store.record_run(config.id, now, &page_ids),
            )
            .await;
            let error = match write_back {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!(
                    "recording last sync timed out after {:?}",
                    self.options.call_timeout
                )),
            };
            if let Some(message) = error {
                tracing::warn!(config = %config.name, "Failed to record last sync: {}", message);
                result.last_sync_error = Some(message);
            }
        }

        if result.cancelled {
            return Ok(result);
        }

        emit(
            self.progress(),
            SyncProgress::SyncComplete {
                imported: result.imported_count,
                deleted: result.deleted_count,
                errors: result.item_errors.len(),
            },
        );
        tracing::info!(
            config = %config.name,
            imported = result.imported_count,
            deleted = result.deleted_count,
            errors = result.item_errors.len(),
            "Sync complete"
        );

        Ok(result)
    }

    /// The names a run of `config` would import, without touching the target.
    pub async fn preview(&self, config: &SyncConfig) -> Result<Vec<String>, SyncError> {
        let provider = self.resolve_provider(config)?;
        let stream = self
            .bounded(provider.fetch(config), |t| {
                SourceError::unreachable(format!("source listing timed out after {t:?}"))
            })
            .await
            .map_err(|error| SyncError::Source {
                error,
                partial: PartialProgress::default(),
            })?;
        Ok(stream.pending_names())
    }

    fn resolve_provider(&self, config: &SyncConfig) -> Result<Arc<dyn SourceProvider>, SyncError> {
        let invalid = |problem: ConfigProblem| SyncError::ConfigInvalid {
            config_id: config.id,
            problem,
        };

        let provider = self.registry.resolve(&config.provider).ok_or_else(|| {
            invalid(ConfigProblem::UnknownProvider {
                provider: config.provider.clone(),
            })
        })?;
        provider
            .validate_config(config)
            .map_err(|e| invalid(e.into()))?;
        Ok(provider)
    }

    /// The pages a replacing run deletes. The parent page imports land under
    /// is never in scope.
    fn pages_in_scope(&self, config: &SyncConfig, existing: Vec<RecentChange>) -> Vec<RecentChange> {
        let parent = config.target_config.parent_page_id.as_deref();
        existing
            .into_iter()
            .filter(|page| Some(page.id.as_str()) != parent)
            .filter(|page| match self.options.delete_scope {
                DeleteScope::AllPages => true,
                DeleteScope::SyncedPages => config.synced_pages.contains(&page.id),
            })
            .collect()
    }

    /// Delete `pages` one by one. Returns true if shutdown interrupted it.
    async fn delete_pages(
        &self,
        pages: &[RecentChange],
        shutdown: &AtomicBool,
        result: &mut SyncResult,
    ) -> bool {
        if pages.is_empty() {
            return false;
        }
        emit(
            self.progress(),
            SyncProgress::DeletingPages { count: pages.len() },
        );

        for page in pages {
            if shutdown.load(Ordering::SeqCst) {
                return true;
            }

            let outcome = self
                .bounded(self.pages.delete_page(&page.id), |t| {
                    TargetError::unavailable(format!("delete timed out after {t:?}"))
                })
                .await;
            match outcome {
                Ok(()) => {
                    result.deleted_count += 1;
                    emit(
                        self.progress(),
                        SyncProgress::DeletedPage {
                            page_id: page.id.clone(),
                            title: page.title.clone(),
                        },
                    );
                }
                Err(e) => {
                    let message = short_error_message(&e);
                    tracing::warn!(page_id = %page.id, "Failed to delete page: {}", message);
                    emit(
                        self.progress(),
                        SyncProgress::DeleteError {
                            page_id: page.id.clone(),
                            error: message.clone(),
                        },
                    );
                    result.item_errors.push(ItemError::delete(&page.id, message));
                }
            }
        }
        false
    }

    async fn import_items(
        &self,
        config: &SyncConfig,
        stream: &mut ContentStream,
        shutdown: &AtomicBool,
        result: &mut SyncResult,
    ) {
        let space_id = config.target_config.space_id.as_str();
        let parent = config.target_config.parent_page_id.as_deref();

        loop {
            if shutdown.load(Ordering::SeqCst) {
                if stream.remaining() > 0 {
                    result.cancelled = true;
                    let remaining = stream.remaining();
                    tracing::info!(config = %config.name, remaining, "Sync cancelled");
                    emit(
                        self.progress(),
                        SyncProgress::Cancelled {
                            imported: result.imported_count,
                            remaining,
                        },
                    );
                }
                return;
            }

            let Some(name) = stream.next_name() else {
                return;
            };

            let item = match tokio::time::timeout(self.options.call_timeout, stream.next()).await {
                Ok(Some(Ok(item))) => item,
                Ok(Some(Err(e))) => {
                    self.record_import_error(result, &e.name, short_error_message(&e.error));
                    continue;
                }
                Ok(None) => return,
                Err(_) => {
                    self.record_import_error(
                        result,
                        &name,
                        format!("fetch timed out after {:?}", self.options.call_timeout),
                    );
                    continue;
                }
            };

            let imported = self
                .bounded(self.pages.import_content(&item, space_id, parent), |t| {
                    TargetError::unavailable(format!("import timed out after {t:?}"))
                })
                .await;
            match imported {
                Ok(page) => {
                    result.imported_count += 1;
                    emit(
                        self.progress(),
                        SyncProgress::ImportedItem {
                            name: item.name.clone(),
                            page_id: page.id.clone(),
                        },
                    );
                    result.imported_pages.push(page.clone());
                    result.last_imported = Some(page);
                }
                Err(e) => self.record_import_error(result, &item.name, short_error_message(&e)),
            }
        }
    }

    fn record_import_error(&self, result: &mut SyncResult, name: &str, message: String) {
        tracing::warn!(item = name, "Failed to import: {}", message);
        emit(
            self.progress(),
            SyncProgress::ImportError {
                name: name.to_string(),
                error: message.clone(),
            },
        );
        result.item_errors.push(ItemError::import(name, message));
    }

    fn finish_cancelled(&self, mut result: SyncResult, remaining: usize) -> SyncResult {
        result.cancelled = true;
        emit(
            self.progress(),
            SyncProgress::Cancelled {
                imported: result.imported_count,
                remaining,
            },
        );
        tracing::info!(deleted = result.deleted_count, "Sync cancelled during deletes");
        result
    }

    /// Bound a collaborator call by `options.call_timeout`.
    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce(Duration) -> E,
    ) -> Result<T, E> {
        let limit = self.options.call_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(on_timeout(limit)),
        }
    }
}
