//! SeaORM-backed config store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use super::convert::{from_model, to_active_model, to_db_time};
use super::errors::{Result, StoreError};
use super::{SyncConfigStore, sort_configs};
use crate::entity::sync_config::{ActiveModel, Column, Entity as SyncConfigEntity};
use crate::sync_config::{NewSyncConfig, SyncConfig, SyncConfigPatch};

/// Stores configs in the `sync_configs` table.
#[derive(Clone)]
pub struct DbConfigStore {
    db: DatabaseConnection,
}

impl DbConfigStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SyncConfigStore for DbConfigStore {
    async fn create(&self, input: NewSyncConfig) -> Result<SyncConfig> {
        input.validate()?;
        let config = input.into_config(Uuid::new_v4(), Utc::now());
        let model = to_active_model(&config).insert(&self.db).await?;
        tracing::debug!(id = %config.id, name = %config.name, "Created sync config");
        from_model(model)
    }

    async fn update(&self, id: Uuid, patch: SyncConfigPatch) -> Result<SyncConfig> {
        patch.validate()?;
        let mut config = self.get(id).await?;
        patch.apply(&mut config, Utc::now());

        // Only the editable columns are marked dirty so a concurrent
        // `record_run` is not overwritten.
        let mut active = to_active_model(&config);
        active.id = Set(id);
        active.last_sync = sea_orm::ActiveValue::NotSet;
        active.synced_pages = sea_orm::ActiveValue::NotSet;
        active.created_at = sea_orm::ActiveValue::NotSet;

        let model = active.update(&self.db).await?;
        from_model(model)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = SyncConfigEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found_by_id(id));
        }
        tracing::debug!(%id, "Deleted sync config");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SyncConfig>> {
        let models = SyncConfigEntity::find()
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?;
        let mut configs = models
            .into_iter()
            .map(from_model)
            .collect::<Result<Vec<_>>>()?;
        sort_configs(&mut configs);
        Ok(configs)
    }

    async fn get(&self, id: Uuid) -> Result<SyncConfig> {
        let model = SyncConfigEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found_by_id(id))?;
        from_model(model)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SyncConfig>> {
        SyncConfigEntity::find()
            .filter(Column::Name.eq(name))
            .order_by_asc(Column::CreatedAt)
            .one(&self.db)
            .await?
            .map(from_model)
            .transpose()
    }

    async fn record_run(&self, id: Uuid, at: DateTime<Utc>, page_ids: &[String]) -> Result<()> {
        let active = ActiveModel {
            id: Set(id),
            last_sync: Set(Some(to_db_time(at))),
            synced_pages: Set(serde_json::Value::from(page_ids.to_vec())),
            ..Default::default()
        };
        match active.update(&self.db).await {
            Ok(_) => Ok(()),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(StoreError::not_found_by_id(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_space(&self, space_id: &str) -> Result<Vec<SyncConfig>> {
        let models = SyncConfigEntity::find()
            .filter(Column::SpaceId.eq(space_id))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?;
        let mut configs = models
            .into_iter()
            .map(from_model)
            .collect::<Result<Vec<_>>>()?;
        sort_configs(&mut configs);
        Ok(configs)
    }
}
