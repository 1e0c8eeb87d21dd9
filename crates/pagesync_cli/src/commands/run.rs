//! `pagesync run`: sync configs now.

use std::sync::Arc;

use console::{Term, style};
use pagesync::store::SyncConfigStore;
use pagesync::sync::{DeleteScope, ItemErrorKind, SyncError, SyncResult};
use pagesync::sync_config::SyncConfig;

use super::shared::{open_store, orchestrator, page_service};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::{is_shutdown_requested, shutdown_flag};

/// Run the named configs (or every enabled config with `all`).
pub(crate) async fn handle_run(
    configs: Vec<String>,
    all: bool,
    delete_scope: Option<DeleteScope>,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;

    let targets: Vec<SyncConfig> = if all {
        store
            .list()
            .await?
            .into_iter()
            .filter(|c| c.enabled)
            .collect()
    } else {
        let mut resolved = Vec::with_capacity(configs.len());
        for name in &configs {
            resolved.push(store.resolve(name).await?);
        }
        resolved
    };

    if targets.is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }

    let is_tty = Term::stdout().is_term();
    let reporter = Arc::new(ProgressReporter::new());
    let pages = page_service(config)?;
    let orchestrator = orchestrator(
        config,
        Arc::clone(&store),
        pages,
        Some(&reporter),
        delete_scope,
    )?;

    let mut failed = 0usize;
    for target in &targets {
        if is_shutdown_requested() {
            break;
        }
        if is_tty {
            println!("{} {}", style("▶").cyan(), style(&target.name).bold());
        }

        let outcome = orchestrator.run_with_shutdown(target, shutdown_flag()).await;
        reporter.finish();
        match outcome {
            Ok(result) => print_result(&result, is_tty),
            Err(e) => {
                failed += 1;
                print_error(target, &e, is_tty);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} sync runs failed", targets.len()).into());
    }
    Ok(())
}

pub(crate) fn print_result(result: &SyncResult, is_tty: bool) {
    if !is_tty {
        tracing::info!(
            config_id = %result.config_id,
            imported = result.imported_count,
            deleted = result.deleted_count,
            errors = result.item_errors.len(),
            cancelled = result.cancelled,
            "Run finished"
        );
        if let Some(e) = &result.last_sync_error {
            tracing::warn!(error = %e, "Last sync time was not recorded");
        }
        return;
    }

    let marker = if result.is_clean() {
        style("✓").green()
    } else {
        style("⚠").yellow()
    };
    println!(
        "{} {} imported, {} deleted, {} errors{}",
        marker,
        result.imported_count,
        result.deleted_count,
        result.item_errors.len(),
        if result.cancelled { " (cancelled)" } else { "" }
    );
    for kind in [ItemErrorKind::DeleteFailed, ItemErrorKind::ImportFailed] {
        for error in result.errors_of(kind) {
            println!("    {} {}", style("✗").red(), error);
        }
    }
    if let Some(e) = &result.last_sync_error {
        println!("{} Last sync time was not recorded: {}", style("⚠").yellow(), e);
    }
}

pub(crate) fn print_error(config: &SyncConfig, error: &SyncError, is_tty: bool) {
    if is_tty {
        println!("{} {}: {}", style("✗").red(), config.name, error);
        if error.target_partially_cleared() {
            println!(
                "    {} Space {} was partially cleared before the failure",
                style("⚠").yellow(),
                config.target_config.space_id
            );
        }
    } else {
        tracing::error!(
            config = %config.name,
            partially_cleared = error.target_partially_cleared(),
            "Sync failed: {}",
            error
        );
    }
}
