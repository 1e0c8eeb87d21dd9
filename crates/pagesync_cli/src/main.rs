//! pagesync CLI - keep Docmost spaces in step with GitHub docs.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::configs::ConfigAction;
use crate::commands::shared::ScopeArg;

#[derive(Parser)]
#[command(name = "pagesync")]
#[command(version)]
#[command(about = "Sync documents from GitHub repositories into Docmost spaces")]
#[command(
    long_about = "pagesync imports the markdown and HTML documents of a GitHub repository \
directory into a Docmost space, replacing the pages a previous sync created. Configs are \
stored locally and can be run on demand, on a cron schedule, or whenever a space goes stale."
)]
#[command(after_long_help = r#"EXAMPLES
    Bind a repository directory to a space:
        $ pagesync config add handbook -r acme/handbook -p docs -s 0190c0de-space

    Preview what would be imported:
        $ pagesync check handbook

    Sync now:
        $ pagesync run handbook

    Keep every config fresh, checking every five minutes:
        $ pagesync watch --interval 300

CONFIGURATION
    pagesync reads configuration from:
      1. ~/.config/pagesync/config.toml (or $XDG_CONFIG_HOME/pagesync/config.toml)
      2. ./pagesync.toml
      3. Environment variables (PAGESYNC_ prefix, sections joined by "__")
      4. .env file in current directory

ENVIRONMENT VARIABLES
    PAGESYNC_DATABASE__URL     Database connection string (default: ~/.local/state/pagesync/pagesync.db)
    PAGESYNC_GITHUB__TOKEN     Fallback GitHub token
    PAGESYNC_DOCMOST__URL      Docmost base URL
    PAGESYNC_DOCMOST__TOKEN    Docmost API token
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage sync configs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Sync one or more configs now
    Run {
        /// Config ids or names
        #[arg(required_unless_present = "all")]
        configs: Vec<String>,

        /// Sync every enabled config
        #[arg(long, conflicts_with = "configs")]
        all: bool,

        /// Which existing pages to delete (default from config: all)
        #[arg(long, value_enum)]
        delete_scope: Option<ScopeArg>,
    },
    /// List the documents a config would import, without touching the wiki
    Check {
        /// Config id or name
        config: String,
    },
    /// Report whether a space is stale
    Stale {
        /// Docmost space id
        space: String,

        /// Staleness threshold in hours (default from config or 24)
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Periodically sync configs whose schedule fired or whose space is stale
    Watch {
        /// Seconds between evaluations (default from config or 300)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Evaluate once and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    shutdown::setup_shutdown_handler();

    // Structured logging only when not attached to a TTY; progress bars otherwise.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("pagesync=info,pagesync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    // `stale` only talks to Docmost.
    if let Commands::Stale { space, hours } = &cli.command {
        return commands::stale::handle_stale(space, *hours, &config).await;
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set [database] url")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Config { action } => {
            let store = commands::shared::open_store(&database_url).await?;
            commands::configs::handle_config(action, store.as_ref()).await?;
        }
        Commands::Run {
            configs,
            all,
            delete_scope,
        } => {
            commands::run::handle_run(
                configs,
                all,
                delete_scope.map(Into::into),
                &config,
                &database_url,
            )
            .await?;
        }
        Commands::Check { config: name } => {
            commands::check::handle_check(&name, &config, &database_url).await?;
        }
        Commands::Watch { interval, once } => {
            commands::watch::handle_watch(interval, once, &config, &database_url).await?;
        }
        Commands::Stale { .. } => {}
    }

    Ok(())
}
