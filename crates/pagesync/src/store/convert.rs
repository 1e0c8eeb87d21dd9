//! Conversion between [`SyncConfig`] and the `sync_configs` row.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;

use super::errors::StoreError;
use crate::entity::sync_config::{ActiveModel, Model};
use crate::sync_config::{Credentials, SyncConfig, TargetConfig};

pub(super) fn to_active_model(config: &SyncConfig) -> ActiveModel {
    ActiveModel {
        id: Set(config.id),
        name: Set(config.name.clone()),
        provider: Set(config.provider.clone()),
        enabled: Set(config.enabled),
        schedule: Set(config.schedule.clone()),
        source_config: Set(serde_json::Value::Object(config.source_config.clone())),
        space_id: Set(config.target_config.space_id.clone()),
        parent_page_id: Set(config.target_config.parent_page_id.clone()),
        update_existing: Set(config.target_config.update_existing),
        credentials: Set(raw_credentials(&config.credentials)),
        synced_pages: Set(serde_json::Value::from(config.synced_pages.clone())),
        last_sync: Set(config.last_sync.map(|t| t.fixed_offset())),
        created_at: Set(config.created_at.fixed_offset()),
        updated_at: Set(config.updated_at.fixed_offset()),
    }
}

/// The unmasked credential map. `Credentials` serializes masked, so it is
/// never passed through serde on the way in.
fn raw_credentials(credentials: &Credentials) -> serde_json::Value {
    serde_json::Value::Object(
        credentials
            .to_raw_map()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    )
}

pub(super) fn from_model(model: Model) -> Result<SyncConfig, StoreError> {
    let id = model.id;
    let corrupt = |message: String| StoreError::Corrupt { id, message };

    let source_config = match model.source_config {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => return Err(corrupt(format!("source_config is not an object: {other}"))),
    };

    let credentials: BTreeMap<String, String> = match model.credentials {
        serde_json::Value::Null => BTreeMap::new(),
        value => serde_json::from_value(value)
            .map_err(|e| corrupt(format!("credentials: {e}")))?,
    };

    let synced_pages: Vec<String> = match model.synced_pages {
        serde_json::Value::Null => Vec::new(),
        value => serde_json::from_value(value)
            .map_err(|e| corrupt(format!("synced_pages: {e}")))?,
    };

    Ok(SyncConfig {
        id,
        name: model.name,
        provider: model.provider,
        enabled: model.enabled,
        schedule: model.schedule,
        source_config,
        target_config: TargetConfig {
            space_id: model.space_id,
            parent_page_id: model.parent_page_id,
            update_existing: model.update_existing,
        },
        credentials: Credentials::from_raw_map(credentials),
        synced_pages,
        last_sync: model.last_sync.map(|t| t.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(super) fn to_db_time(t: DateTime<Utc>) -> sea_orm::prelude::DateTimeWithTimeZone {
    t.fixed_offset()
}
