//! Configuration file support for pagesync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `PAGESYNC_`, sections separated by
//!    a double underscore, e.g. `PAGESYNC_DOCMOST__TOKEN`)
//! 3. Config file (./pagesync.toml, then ~/.config/pagesync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/pagesync/pagesync.db` on
//! Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/pagesync/pagesync.db"  # optional, this is the default
//!
//! [github]
//! token = "ghp_..."  # used when a sync config has no accessToken credential
//! api_url = "https://api.github.com"
//!
//! [docmost]
//! url = "https://wiki.example.com"
//! token = "..."
//!
//! [sync]
//! staleness_hours = 24
//! call_timeout_secs = 30
//! requests_per_second = 10
//! delete_scope = "all_pages"  # or "synced_pages"
//! lock_wait = false
//! watch_interval_secs = 300
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use pagesync::github::{DEFAULT_API_URL, GitHubSettings};
use pagesync::rate_limit::GITHUB_DEFAULT_RPS;
use pagesync::staleness::DEFAULT_STALENESS_HOURS;
use pagesync::sync::{DEFAULT_CALL_TIMEOUT, DeleteScope, LockPolicy, SyncOptions};
use serde::Deserialize;

const APP_NAME: &str = "pagesync";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub docmost: DocmostConfig,
    /// Defaults for sync runs.
    pub sync: SyncSettings,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Fallback token for configs without an `accessToken` credential.
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Docmost configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocmostConfig {
    /// Base URL of the Docmost instance, e.g. `https://wiki.example.com`.
    pub url: Option<String>,
    /// API token.
    pub token: Option<String>,
}

/// Defaults for sync runs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// A space untouched for this long is considered stale.
    pub staleness_hours: i64,
    /// Bound on every listing, delete, import and fetch.
    pub call_timeout_secs: u64,
    /// Pace of GitHub API requests.
    pub requests_per_second: u32,
    /// `all_pages` or `synced_pages`.
    pub delete_scope: String,
    /// Queue behind a running sync of the same config instead of failing.
    pub lock_wait: bool,
    /// Default interval for `pagesync watch`.
    pub watch_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            staleness_hours: DEFAULT_STALENESS_HOURS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            requests_per_second: GITHUB_DEFAULT_RPS,
            delete_scope: DeleteScope::default().to_string(),
            lock_wait: false,
            watch_interval_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/pagesync/config.toml)
    /// 3. Local config file (./pagesync.toml)
    /// 4. Environment variables with PAGESYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("pagesync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./pagesync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., PAGESYNC_DATABASE__URL -> database.url
        builder = builder.add_source(environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("pagesync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn github_settings(&self) -> GitHubSettings {
        GitHubSettings {
            api_url: self.github.api_url.clone(),
            default_token: self.github.token.clone(),
            timeout: self.call_timeout(),
            requests_per_second: self.sync.requests_per_second,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.call_timeout_secs.max(1))
    }

    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sync.staleness_hours.max(0))
    }

    /// Engine options, with `delete_scope` overridable from the command line.
    pub fn sync_options(&self, delete_scope: Option<DeleteScope>) -> Result<SyncOptions, String> {
        let delete_scope = match delete_scope {
            Some(scope) => scope,
            None => self.sync.delete_scope.parse()?,
        };
        Ok(SyncOptions {
            call_timeout: self.call_timeout(),
            delete_scope,
            lock_policy: if self.sync.lock_wait {
                LockPolicy::Wait
            } else {
                LockPolicy::Reject
            },
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/pagesync` or `~/.local/state/pagesync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix("PAGESYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert!(config.docmost.url.is_none());
        assert_eq!(config.sync.staleness_hours, 24);
        assert_eq!(config.sync.call_timeout_secs, 30);
        assert_eq!(config.sync.delete_scope, "all_pages");
        assert!(!config.sync.lock_wait);
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"

            [docmost]
            url = "https://wiki.example.com"
            token = "dm_token"

            [sync]
            staleness_hours = 6
            call_timeout_secs = 10
            delete_scope = "synced_pages"
            lock_wait = true
        "#,
        );

        assert_eq!(config.database.url.as_deref(), Some("sqlite:///tmp/test.db"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_test123"));
        assert_eq!(config.docmost.url.as_deref(), Some("https://wiki.example.com"));
        assert_eq!(config.docmost.token.as_deref(), Some("dm_token"));
        assert_eq!(config.staleness_threshold(), chrono::Duration::hours(6));

        let options = config.sync_options(None).unwrap();
        assert_eq!(options.call_timeout, Duration::from_secs(10));
        assert_eq!(options.delete_scope, DeleteScope::SyncedPages);
        assert_eq!(options.lock_policy, LockPolicy::Wait);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = from_toml(
            r#"
            [sync]
            staleness_hours = 48
        "#,
        );

        assert_eq!(config.sync.staleness_hours, 48);
        assert_eq!(config.sync.call_timeout_secs, 30);
        assert_eq!(config.sync.requests_per_second, GITHUB_DEFAULT_RPS);
    }

    #[test]
    fn test_cli_delete_scope_wins() {
        let config = Config::default();
        let options = config.sync_options(Some(DeleteScope::SyncedPages)).unwrap();
        assert_eq!(options.delete_scope, DeleteScope::SyncedPages);
    }

    #[test]
    fn test_unknown_delete_scope_is_an_error() {
        let config = from_toml(
            r#"
            [sync]
            delete_scope = "everything"
        "#,
        );
        assert!(config.sync_options(None).is_err());
    }

    #[test]
    fn test_github_settings_carry_token_and_pacing() {
        let config = from_toml(
            r#"
            [github]
            token = "ghp_test123"
            api_url = "https://github.example.com/api/v3"

            [sync]
            requests_per_second = 3
        "#,
        );

        let settings = config.github_settings();
        assert_eq!(settings.default_token.as_deref(), Some("ghp_test123"));
        assert_eq!(settings.api_url, "https://github.example.com/api/v3");
        assert_eq!(settings.requests_per_second, 3);
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let url = Config::default().database_url().unwrap();
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("pagesync.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/pagesync"
        "#,
        );
        assert_eq!(
            config.database_url(),
            Some("postgres://localhost/pagesync".to_string())
        );
    }

    #[test]
    fn test_config_merging_order() {
        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(
                "[sync]\nstaleness_hours = 24\ncall_timeout_secs = 20",
                FileFormat::Toml,
            ))
            .add_source(config::File::from_str(
                "[sync]\nstaleness_hours = 12",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.sync.staleness_hours, 12);
        assert_eq!(config.sync.call_timeout_secs, 20);
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[sync\nstaleness_hours = 1", FileFormat::Toml))
            .build();
        assert!(result.is_err());
    }
}
