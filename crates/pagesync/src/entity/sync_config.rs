//! Sync config entity - one persisted source → target relationship.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted sync config row.
///
/// Provider settings, credentials and synced page ids are stored as JSON so
/// new providers do not need schema changes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Provider discriminator (e.g. "github").
    pub provider: String,

    pub enabled: bool,

    /// Cron expression; empty for staleness-only triggering.
    pub schedule: String,

    #[sea_orm(column_type = "Json")]
    pub source_config: Json,

    /// Target space.
    pub space_id: String,

    pub parent_page_id: Option<String>,

    pub update_existing: bool,

    /// Raw credential map. Never rendered outside the store.
    #[sea_orm(column_type = "Json")]
    pub credentials: Json,

    /// Page ids created by the most recent run.
    #[sea_orm(column_type = "Json")]
    pub synced_pages: Json,

    pub last_sync: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
