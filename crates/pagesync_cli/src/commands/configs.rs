//! Sync config management commands.
//!
//! Commands for managing sync configs (add, list, show, update, remove).

use clap::Subcommand;
use console::style;
use pagesync::github::GITHUB_PROVIDER;
use pagesync::store::SyncConfigStore;
use pagesync::sync_config::{
    ACCESS_TOKEN_KEY, Credentials, NewSyncConfig, SyncConfig, SyncConfigPatch, TargetConfig,
};
use serde_json::{Map, Value};
use tabled::{Table, Tabled, settings::Style};

use super::shared::OutputFormat;

/// Sync config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Add a sync config binding a GitHub directory to a Docmost space
    Add {
        /// Config name
        name: String,

        /// Repository as owner/repo
        #[arg(short, long)]
        repository: String,

        /// Branch to read from
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Directory (or single file) inside the repository; empty for the root
        #[arg(short, long, default_value = "")]
        path: String,

        /// Target Docmost space id
        #[arg(short, long)]
        space: String,

        /// Parent page for imported pages
        #[arg(long)]
        parent: Option<String>,

        /// Cron schedule (5 or 6 fields); empty for staleness-only
        #[arg(long, default_value = "")]
        schedule: String,

        /// Only import; never delete existing pages
        #[arg(long)]
        append: bool,

        /// GitHub token for this config (overrides [github] token)
        #[arg(long, env = "PAGESYNC_CONFIG_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Create the config disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List all sync configs
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show one sync config (credentials are masked)
    Show {
        /// Config id or name
        config: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Update fields of a sync config
    Update {
        /// Config id or name
        config: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        repository: Option<String>,

        #[arg(short, long)]
        branch: Option<String>,

        #[arg(short, long)]
        path: Option<String>,

        #[arg(short, long)]
        space: Option<String>,

        #[arg(long)]
        schedule: Option<String>,

        #[arg(long)]
        token: Option<String>,

        /// Enable the config
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the config
        #[arg(long)]
        disable: bool,
    },
    /// Remove a sync config (pages already imported are kept)
    Remove {
        /// Config id or name
        config: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Display struct for config listings.
#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct ConfigDisplay {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Space")]
    space_id: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Schedule")]
    schedule: String,
    #[tabled(rename = "Last Sync")]
    last_sync: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&SyncConfig> for ConfigDisplay {
    fn from(config: &SyncConfig) -> Self {
        Self {
            name: config.name.clone(),
            source: source_label(config),
            space_id: config.target_config.space_id.clone(),
            enabled: config.enabled,
            schedule: if config.schedule.is_empty() {
                "-".to_string()
            } else {
                config.schedule.clone()
            },
            last_sync: config
                .last_sync
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            id: config.id.to_string(),
        }
    }
}

fn source_label(config: &SyncConfig) -> String {
    let repository = config.source_str("repository").unwrap_or("?");
    let branch = config.source_str("branch").unwrap_or("?");
    match config.source_str("path") {
        Some(path) if !path.is_empty() => format!("{repository}:{path}@{branch}"),
        _ => format!("{repository}@{branch}"),
    }
}

fn github_source(repository: &str, branch: &str, path: &str) -> Map<String, Value> {
    let mut source = Map::new();
    source.insert("repository".into(), Value::from(repository));
    source.insert("branch".into(), Value::from(branch));
    source.insert("path".into(), Value::from(path));
    source
}

/// Handle config management commands.
pub async fn handle_config(
    action: ConfigAction,
    store: &dyn SyncConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Add {
            name,
            repository,
            branch,
            path,
            space,
            parent,
            schedule,
            append,
            token,
            disabled,
        } => {
            let mut credentials = Credentials::new();
            if let Some(token) = token {
                credentials.insert(ACCESS_TOKEN_KEY, token);
            }
            let config = store
                .create(NewSyncConfig {
                    name,
                    provider: GITHUB_PROVIDER.to_string(),
                    enabled: !disabled,
                    schedule,
                    source_config: github_source(&repository, &branch, &path),
                    target_config: TargetConfig {
                        space_id: space,
                        parent_page_id: parent,
                        update_existing: !append,
                    },
                    credentials,
                })
                .await?;
            println!(
                "{} Added sync config '{}' ({})",
                style("✓").green(),
                config.name,
                config.id
            );
        }
        ConfigAction::List { output } => {
            let configs = store.list().await?;
            match output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&configs)?);
                }
                OutputFormat::Table => {
                    if configs.is_empty() {
                        println!("No sync configs. Add one with: pagesync config add");
                        return Ok(());
                    }
                    let rows: Vec<ConfigDisplay> = configs.iter().map(ConfigDisplay::from).collect();
                    let mut table = Table::new(rows);
                    table.with(Style::rounded());
                    println!("{table}");
                }
            }
        }
        ConfigAction::Show { config, output } => {
            let config = store.resolve(&config).await?;
            match output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                OutputFormat::Table => print_details(&config),
            }
        }
        ConfigAction::Update {
            config,
            name,
            repository,
            branch,
            path,
            space,
            schedule,
            token,
            enable,
            disable,
        } => {
            let existing = store.resolve(&config).await?;

            let source_config = if repository.is_some() || branch.is_some() || path.is_some() {
                Some(github_source(
                    repository
                        .as_deref()
                        .or(existing.source_str("repository"))
                        .unwrap_or_default(),
                    branch
                        .as_deref()
                        .or(existing.source_str("branch"))
                        .unwrap_or_default(),
                    path.as_deref()
                        .or(existing.source_str("path"))
                        .unwrap_or_default(),
                ))
            } else {
                None
            };
            let target_config = space.map(|space_id| TargetConfig {
                space_id,
                ..existing.target_config.clone()
            });
            let credentials = token.map(|token| existing.credentials.clone().with(ACCESS_TOKEN_KEY, token));
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };

            let updated = store
                .update(
                    existing.id,
                    SyncConfigPatch {
                        name,
                        enabled,
                        schedule,
                        source_config,
                        target_config,
                        credentials,
                        ..Default::default()
                    },
                )
                .await?;
            println!("{} Updated sync config '{}'", style("✓").green(), updated.name);
        }
        ConfigAction::Remove { config, yes } => {
            let existing = store.resolve(&config).await?;
            if !yes {
                println!(
                    "{} This removes the sync config '{}'. Pages already in space {} are kept.",
                    style("⚠").yellow(),
                    existing.name,
                    existing.target_config.space_id
                );
                println!("Run again with --yes to confirm.");
                return Ok(());
            }
            store.delete(existing.id).await?;
            println!("{} Removed sync config '{}'", style("✓").green(), existing.name);
        }
    }
    Ok(())
}

fn print_details(config: &SyncConfig) {
    let row = |label: &str, value: String| println!("{:>16}  {}", style(label).bold(), value);

    row("Name", config.name.clone());
    row("ID", config.id.to_string());
    row("Provider", config.provider.clone());
    row("Enabled", config.enabled.to_string());
    row("Source", source_label(config));
    row("Space", config.target_config.space_id.clone());
    row(
        "Parent page",
        config
            .target_config
            .parent_page_id
            .clone()
            .unwrap_or_else(|| "-".to_string()),
    );
    row(
        "Mode",
        if config.target_config.update_existing {
            "replace".to_string()
        } else {
            "append".to_string()
        },
    );
    row(
        "Schedule",
        if config.schedule.is_empty() {
            "staleness only".to_string()
        } else {
            config.schedule.clone()
        },
    );
    row(
        "Credentials",
        serde_json::to_string(&config.credentials).unwrap_or_default(),
    );
    row(
        "Last sync",
        config
            .last_sync
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    );
    row("Synced pages", config.synced_pages.len().to_string());
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn config(path: &str) -> SyncConfig {
        NewSyncConfig {
            name: "Docs".into(),
            provider: GITHUB_PROVIDER.into(),
            enabled: true,
            schedule: String::new(),
            source_config: github_source("org/repo", "main", path),
            target_config: TargetConfig::new("space-1"),
            credentials: Credentials::new().with(ACCESS_TOKEN_KEY, "ghp_secret"),
        }
        .into_config(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn source_label_includes_path_when_set() {
        assert_eq!(source_label(&config("docs")), "org/repo:docs@main");
        assert_eq!(source_label(&config("")), "org/repo@main");
    }

    #[test]
    fn display_row_has_no_secrets() {
        let row = ConfigDisplay::from(&config("docs"));
        assert_eq!(row.schedule, "-");
        assert_eq!(row.last_sync, "never");
        assert!(!serde_json::to_string(&row).unwrap().contains("ghp_secret"));
    }
}
