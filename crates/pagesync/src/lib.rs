//! pagesync - Keep wiki spaces in step with documents in Git repositories.
//!
//! A sync config binds a source (a directory of a GitHub repository) to a
//! target space in a Docmost wiki. Running it replaces the space's pages with
//! the markdown and HTML documents the source lists.
//!
//! # Features
//!
//! - `github` - The GitHub source provider.
//! - `docmost` - The Docmost page service client.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use pagesync::{connect_and_migrate, store::DbConfigStore, sync::SyncOrchestrator};
//!
//! let db = connect_and_migrate("sqlite://pagesync.db?mode=rwc").await?;
//! let store = Arc::new(DbConfigStore::new(db));
//! let config = store.resolve("Handbook").await?;
//!
//! let registry = ProviderRegistry::new().with(Arc::new(GitHubProvider::new(settings)?));
//! let orchestrator = SyncOrchestrator::new(registry, Arc::new(docmost)).with_store(store);
//! let result = orchestrator.run(&config).await?;
//! ```

pub mod db;
pub mod entity;
pub mod http;
pub mod rate_limit;
pub mod schedule;
pub mod source;
pub mod staleness;
pub mod store;
pub mod sync;
pub mod sync_config;
pub mod target;
pub mod trigger;

#[cfg(feature = "github")]
pub mod retry;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use source::{ContentItem, ContentStream, ProviderRegistry, SourceError, SourceProvider};
pub use staleness::{Staleness, StalenessMonitor};
pub use store::{DbConfigStore, MemoryConfigStore, StoreError, SyncConfigStore};
pub use sync::{SyncError, SyncOptions, SyncOrchestrator, SyncProgress, SyncResult};
pub use sync_config::{Credentials, NewSyncConfig, SyncConfig, SyncConfigPatch, TargetConfig};
pub use target::{PageRef, PageService, RecentChange, TargetError};
pub use trigger::{OutcomeKind, SyncTrigger, TriggerOutcome};
