//! `pagesync check`: list what a run would import, without touching the wiki.

use std::sync::Arc;

use console::style;
use pagesync::store::SyncConfigStore;
use pagesync::sync::SyncOrchestrator;
use pagesync::target::MemoryPageService;

use super::shared::{open_store, registry};
use crate::config::Config;

pub(crate) async fn handle_check(
    name: &str,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let sync_config = store.resolve(name).await?;

    // Preview never touches the target, so no Docmost credentials are needed.
    let orchestrator = SyncOrchestrator::new(registry(config, None)?, Arc::new(MemoryPageService::new()))
        .with_options(config.sync_options(None)?);
    let names = orchestrator.preview(&sync_config).await?;

    println!(
        "{} '{}' would import {} document{}:",
        style("✓").green(),
        sync_config.name,
        names.len(),
        if names.len() == 1 { "" } else { "s" }
    );
    for name in names {
        println!("    {name}");
    }
    Ok(())
}
