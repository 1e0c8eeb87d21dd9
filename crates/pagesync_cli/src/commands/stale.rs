//! `pagesync stale`: report whether a space is due for a sync.

use console::style;
use pagesync::staleness::{Staleness, StalenessMonitor};

use super::shared::page_service;
use crate::config::Config;

pub(crate) async fn handle_stale(
    space_id: &str,
    hours: Option<i64>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let threshold = match hours {
        Some(hours) => chrono::Duration::hours(hours.max(0)),
        None => config.staleness_threshold(),
    };
    let monitor = StalenessMonitor::new(page_service(config)?).with_timeout(config.call_timeout());

    match monitor.check(space_id, threshold).await {
        Staleness::Unknown(e) => {
            return Err(format!("Could not determine staleness of {space_id}: {e}").into());
        }
        staleness if staleness.is_stale() => {
            println!("{} {space_id} is {staleness}", style("⚠").yellow());
        }
        staleness => {
            println!("{} {space_id} is {staleness}", style("✓").green());
        }
    }
    Ok(())
}
