//! Wiring shared by the commands that talk to GitHub and Docmost.

use std::sync::Arc;

use clap::ValueEnum;
use pagesync::github::GitHubProvider;
use pagesync::source::ProviderRegistry;
use pagesync::store::{DbConfigStore, SyncConfigStore};
use pagesync::sync::{DeleteScope, SyncOrchestrator};
use pagesync::target::{DocmostClient, PageService};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Delete scope as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ScopeArg {
    /// Every page in the target space
    All,
    /// Only pages created by the config's previous run
    Synced,
}

impl From<ScopeArg> for DeleteScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::All => DeleteScope::AllPages,
            ScopeArg::Synced => DeleteScope::SyncedPages,
        }
    }
}

/// Open the config store, running pending migrations.
pub(crate) async fn open_store(
    database_url: &str,
) -> Result<Arc<DbConfigStore>, Box<dyn std::error::Error>> {
    let db = pagesync::connect_and_migrate(database_url).await?;
    Ok(Arc::new(DbConfigStore::new(db)))
}

/// The Docmost client described by `[docmost]`.
pub(crate) fn page_service(config: &Config) -> Result<Arc<dyn PageService>, Box<dyn std::error::Error>> {
    let url = config.docmost.url.as_deref().ok_or(
        "Docmost URL not configured. Set [docmost] url in pagesync.toml or PAGESYNC_DOCMOST__URL",
    )?;
    let token = config.docmost.token.as_deref().ok_or(
        "Docmost token not configured. Set [docmost] token in pagesync.toml or PAGESYNC_DOCMOST__TOKEN",
    )?;
    let client = DocmostClient::new(url, token, config.call_timeout())?;
    Ok(Arc::new(client))
}

/// Source providers, reporting rate-limit backoffs through `reporter` if given.
pub(crate) fn registry(
    config: &Config,
    reporter: Option<&Arc<ProgressReporter>>,
) -> Result<ProviderRegistry, Box<dyn std::error::Error>> {
    let mut github = GitHubProvider::new(config.github_settings())?;
    if let Some(reporter) = reporter {
        github = github.with_progress(reporter.as_callback());
    }
    Ok(ProviderRegistry::new().with(Arc::new(github)))
}

/// An orchestrator writing `last_sync` back to `store`.
pub(crate) fn orchestrator(
    config: &Config,
    store: Arc<DbConfigStore>,
    pages: Arc<dyn PageService>,
    reporter: Option<&Arc<ProgressReporter>>,
    delete_scope: Option<DeleteScope>,
) -> Result<SyncOrchestrator, Box<dyn std::error::Error>> {
    let options = config.sync_options(delete_scope)?;
    let mut orchestrator = SyncOrchestrator::new(registry(config, reporter)?, pages)
        .with_store(store as Arc<dyn SyncConfigStore>)
        .with_options(options);
    if let Some(reporter) = reporter {
        orchestrator = orchestrator.with_progress(reporter.as_callback());
    }
    Ok(orchestrator)
}
