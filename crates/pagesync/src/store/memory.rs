//! In-process config store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{Result, StoreError};
use super::{SyncConfigStore, sort_configs};
use crate::sync_config::{NewSyncConfig, SyncConfig, SyncConfigPatch};

/// A [`SyncConfigStore`] kept in a map. Used by tests and embedders that
/// manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    configs: Mutex<HashMap<Uuid, SyncConfig>>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed config as-is.
    pub fn insert(&self, config: SyncConfig) {
        self.lock().insert(config.id, config);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SyncConfig>> {
        self.configs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SyncConfigStore for MemoryConfigStore {
    async fn create(&self, input: NewSyncConfig) -> Result<SyncConfig> {
        input.validate()?;
        let config = input.into_config(Uuid::new_v4(), Utc::now());
        self.lock().insert(config.id, config.clone());
        Ok(config)
    }

    async fn update(&self, id: Uuid, patch: SyncConfigPatch) -> Result<SyncConfig> {
        patch.validate()?;
        let mut configs = self.lock();
        let config = configs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found_by_id(id))?;
        patch.apply(config, Utc::now());
        Ok(config.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found_by_id(id))
    }

    async fn list(&self) -> Result<Vec<SyncConfig>> {
        let mut configs: Vec<SyncConfig> = self.lock().values().cloned().collect();
        sort_configs(&mut configs);
        Ok(configs)
    }

    async fn get(&self, id: Uuid) -> Result<SyncConfig> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found_by_id(id))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SyncConfig>> {
        let mut matches: Vec<SyncConfig> = self
            .lock()
            .values()
            .filter(|c| c.name == name)
            .cloned()
            .collect();
        sort_configs(&mut matches);
        Ok(matches.into_iter().next())
    }

    async fn record_run(&self, id: Uuid, at: DateTime<Utc>, page_ids: &[String]) -> Result<()> {
        let mut configs = self.lock();
        let config = configs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found_by_id(id))?;
        config.last_sync = Some(at);
        config.synced_pages = page_ids.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_config::{ConfigValidationError, TargetConfig};

    fn input(name: &str, space: &str) -> NewSyncConfig {
        NewSyncConfig {
            name: name.into(),
            provider: "github".into(),
            enabled: true,
            schedule: String::new(),
            source_config: serde_json::Map::new(),
            target_config: TargetConfig::new(space),
            credentials: Default::default(),
        }
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let store = MemoryConfigStore::new();
        let created = store.create(input("Docs", "s1")).await.unwrap();
        assert_eq!(store.get(created.id).await.unwrap(), created);

        let updated = store
            .update(
                created.id,
                SyncConfigPatch {
                    name: Some("Handbook".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Handbook");
        assert_eq!(updated.created_at, created.created_at);

        assert_eq!(store.resolve("Handbook").await.unwrap().id, created.id);
        assert_eq!(
            store.resolve(&created.id.to_string()).await.unwrap().id,
            created.id
        );

        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.unwrap_err().is_not_found());
        assert!(store.delete(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn create_validates_input() {
        let store = MemoryConfigStore::new();
        let err = store.create(input("", "s1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invalid(ConfigValidationError::Empty { field: "name" })
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_run_sets_last_sync_and_pages() {
        let store = MemoryConfigStore::new();
        let created = store.create(input("Docs", "s1")).await.unwrap();
        let at = Utc::now();

        store
            .record_run(created.id, at, &["p1".to_string()])
            .await
            .unwrap();

        let config = store.get(created.id).await.unwrap();
        assert_eq!(config.last_sync, Some(at));
        assert_eq!(config.synced_pages, vec!["p1"]);
        assert!(
            store
                .record_run(Uuid::new_v4(), at, &[])
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn list_for_space_filters() {
        let store = MemoryConfigStore::new();
        store.create(input("A", "s1")).await.unwrap();
        store.create(input("B", "s2")).await.unwrap();

        let configs = store.list_for_space("s2").await.unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "B");
    }
}
