//! Persistence for [`SyncConfig`] records.
//!
//! Two implementations: [`DbConfigStore`] on SeaORM and the in-process
//! [`MemoryConfigStore`]. The sync engine only needs [`SyncConfigStore::record_run`].

mod convert;
mod database;
mod errors;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sync_config::{NewSyncConfig, SyncConfig, SyncConfigPatch};

pub use database::DbConfigStore;
pub use errors::{Result, StoreError};
pub use memory::MemoryConfigStore;

/// CRUD over sync configs.
#[async_trait]
pub trait SyncConfigStore: Send + Sync {
    /// Validate and persist a new config, assigning its id.
    async fn create(&self, input: NewSyncConfig) -> Result<SyncConfig>;

    /// Apply a partial update. `id`, `created_at` and `last_sync` are never
    /// touched by an update.
    async fn update(&self, id: Uuid, patch: SyncConfigPatch) -> Result<SyncConfig>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// All configs, oldest first.
    async fn list(&self) -> Result<Vec<SyncConfig>>;

    async fn get(&self, id: Uuid) -> Result<SyncConfig>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SyncConfig>>;

    /// Write back the outcome of a run: completion time and the pages it
    /// created.
    async fn record_run(&self, id: Uuid, at: DateTime<Utc>, page_ids: &[String]) -> Result<()>;

    /// Configs targeting one space, oldest first.
    async fn list_for_space(&self, space_id: &str) -> Result<Vec<SyncConfig>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|c| c.target_config.space_id == space_id)
            .collect())
    }

    /// Look a config up by id or, failing that, by exact name.
    async fn resolve(&self, id_or_name: &str) -> Result<SyncConfig> {
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            return self.get(id).await;
        }
        self.find_by_name(id_or_name)
            .await?
            .ok_or_else(|| StoreError::not_found_by_name(id_or_name))
    }
}

fn sort_configs(configs: &mut [SyncConfig]) {
    configs.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}
