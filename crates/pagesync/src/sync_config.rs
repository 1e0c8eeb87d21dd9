//! The `SyncConfig` domain model.
//!
//! A sync config describes one source → target relationship. Records are
//! created, edited and deleted through a [`SyncConfigStore`](crate::store::SyncConfigStore);
//! the sync engine only reads them and writes back `last_sync`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::schedule::CronSchedule;

/// Placeholder rendered wherever a secret would otherwise be shown.
pub const MASKED_SECRET: &str = "********";

/// Credential key holding the source access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Secret values attached to a sync config.
///
/// `Debug` and `Serialize` only ever render [`MASKED_SECRET`]; the raw value is
/// reachable through [`Credentials::get`] for the code that actually needs it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// The raw secret for `key`, ignoring empty values.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Raw key/value pairs, for persistence layers only.
    #[must_use]
    pub fn to_raw_map(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }

    #[must_use]
    pub fn from_raw_map(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, MASKED_SECRET)))
            .finish()
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.keys().map(|k| (k, MASKED_SECRET)))
    }
}

/// Where synced content lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// The target space.
    pub space_id: String,
    /// Optional parent page for imported pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<String>,
    /// Replace existing pages before importing. When false the run only
    /// appends.
    #[serde(default = "default_update_existing")]
    pub update_existing: bool,
}

fn default_update_existing() -> bool {
    true
}

impl TargetConfig {
    #[must_use]
    pub fn new(space_id: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            parent_page_id: None,
            update_existing: true,
        }
    }
}

/// A persisted synchronization relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub id: Uuid,
    pub name: String,
    /// Provider discriminator, e.g. `"github"`.
    pub provider: String,
    pub enabled: bool,
    /// Cron expression, or empty for staleness-only triggering.
    pub schedule: String,
    /// Provider-specific settings.
    pub source_config: serde_json::Map<String, serde_json::Value>,
    pub target_config: TargetConfig,
    pub credentials: Credentials,
    /// Page ids created by the most recent run.
    #[serde(default)]
    pub synced_pages: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncConfig {
    /// A source setting as a string, if present and a string.
    #[must_use]
    pub fn source_str(&self, key: &str) -> Option<&str> {
        self.source_config.get(key).and_then(|v| v.as_str())
    }

    /// The parsed schedule, `None` when the field is empty or unparseable.
    #[must_use]
    pub fn cron_schedule(&self) -> Option<CronSchedule> {
        if self.schedule.trim().is_empty() {
            return None;
        }
        CronSchedule::parse(&self.schedule).ok()
    }
}

/// Validation failures for config input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid schedule '{expr}': {reason}")]
    Schedule { expr: String, reason: String },
}

/// Input for creating a sync config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSyncConfig {
    pub name: String,
    pub provider: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub source_config: serde_json::Map<String, serde_json::Value>,
    pub target_config: TargetConfig,
    #[serde(default)]
    pub credentials: Credentials,
}

fn default_enabled() -> bool {
    true
}

impl NewSyncConfig {
    /// Check the fields every config needs regardless of provider.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("provider", &self.provider)?;
        require_non_empty("targetConfig.spaceId", &self.target_config.space_id)?;
        validate_schedule(&self.schedule)
    }

    /// Materialize the record a store persists.
    #[must_use]
    pub fn into_config(self, id: Uuid, now: DateTime<Utc>) -> SyncConfig {
        SyncConfig {
            id,
            name: self.name,
            provider: self.provider,
            enabled: self.enabled,
            schedule: self.schedule,
            source_config: self.source_config,
            target_config: self.target_config,
            credentials: self.credentials,
            synced_pages: Vec::new(),
            last_sync: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SyncConfigPatch {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub enabled: Option<bool>,
    pub schedule: Option<String>,
    pub source_config: Option<serde_json::Map<String, serde_json::Value>>,
    pub target_config: Option<TargetConfig>,
    pub credentials: Option<Credentials>,
}

impl SyncConfigPatch {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(provider) = &self.provider {
            require_non_empty("provider", provider)?;
        }
        if let Some(target) = &self.target_config {
            require_non_empty("targetConfig.spaceId", &target.space_id)?;
        }
        if let Some(schedule) = &self.schedule {
            validate_schedule(schedule)?;
        }
        Ok(())
    }

    /// Apply the patch, bumping `updated_at`.
    pub fn apply(self, config: &mut SyncConfig, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(schedule) = self.schedule {
            config.schedule = schedule;
        }
        if let Some(source_config) = self.source_config {
            config.source_config = source_config;
        }
        if let Some(target_config) = self.target_config {
            config.target_config = target_config;
        }
        if let Some(credentials) = self.credentials {
            config.credentials = credentials;
        }
        config.updated_at = now;
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigValidationError> {
    if value.trim().is_empty() {
        Err(ConfigValidationError::Empty { field })
    } else {
        Ok(())
    }
}

fn validate_schedule(expr: &str) -> Result<(), ConfigValidationError> {
    if expr.trim().is_empty() {
        return Ok(());
    }
    CronSchedule::parse(expr)
        .map(|_| ())
        .map_err(|e| ConfigValidationError::Schedule {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_config() -> NewSyncConfig {
        let mut source = serde_json::Map::new();
        source.insert("repository".into(), "org/repo".into());
        NewSyncConfig {
            name: "Docs".to_string(),
            provider: "github".to_string(),
            enabled: true,
            schedule: "0 0 * * 0".to_string(),
            source_config: source,
            target_config: TargetConfig::new("space-1"),
            credentials: Credentials::new().with(ACCESS_TOKEN_KEY, "ghp_secret"),
        }
    }

    #[test]
    fn credentials_debug_and_serialize_are_masked() {
        let creds = Credentials::new().with(ACCESS_TOKEN_KEY, "ghp_secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains(MASKED_SECRET));

        let json = serde_json::to_string(&creds).unwrap();
        assert_eq!(json, r#"{"accessToken":"********"}"#);
        assert_eq!(creds.get(ACCESS_TOKEN_KEY), Some("ghp_secret"));
    }

    #[test]
    fn credentials_get_ignores_empty_values() {
        let creds = Credentials::new().with(ACCESS_TOKEN_KEY, "");
        assert_eq!(creds.get(ACCESS_TOKEN_KEY), None);
    }

    #[test]
    fn sync_config_debug_never_leaks_token() {
        let config = new_config().into_config(Uuid::new_v4(), Utc::now());
        assert!(!format!("{config:?}").contains("ghp_secret"));
        assert!(!serde_json::to_string(&config).unwrap().contains("ghp_secret"));
    }

    #[test]
    fn validate_accepts_well_formed_input() {
        assert_eq!(new_config().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_empty_name_and_space() {
        let mut input = new_config();
        input.name = "  ".to_string();
        assert_eq!(
            input.validate(),
            Err(ConfigValidationError::Empty { field: "name" })
        );

        let mut input = new_config();
        input.target_config.space_id = String::new();
        assert_eq!(
            input.validate(),
            Err(ConfigValidationError::Empty {
                field: "targetConfig.spaceId"
            })
        );
    }

    #[test]
    fn validate_rejects_bad_schedule_but_allows_empty() {
        let mut input = new_config();
        input.schedule = "every tuesday".to_string();
        assert!(matches!(
            input.validate(),
            Err(ConfigValidationError::Schedule { .. })
        ));

        input.schedule = String::new();
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn patch_apply_updates_only_given_fields() {
        let created = Utc::now() - chrono::Duration::hours(1);
        let mut config = new_config().into_config(Uuid::new_v4(), created);
        let now = Utc::now();

        SyncConfigPatch {
            enabled: Some(false),
            ..Default::default()
        }
        .apply(&mut config, now);

        assert!(!config.enabled);
        assert_eq!(config.name, "Docs");
        assert_eq!(config.updated_at, now);
        assert_eq!(config.created_at, created);
    }

    #[test]
    fn target_config_defaults_update_existing_when_missing() {
        let target: TargetConfig = serde_json::from_str(r#"{"spaceId":"s1"}"#).unwrap();
        assert!(target.update_existing);
        assert_eq!(target.parent_page_id, None);
    }
}
