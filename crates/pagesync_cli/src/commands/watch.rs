//! `pagesync watch`: evaluate configs on a timer and sync the due ones.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use console::{Term, style};
use pagesync::staleness::StalenessMonitor;
use pagesync::store::{StoreError, SyncConfigStore};
use pagesync::trigger::{OutcomeKind, SyncTrigger, TriggerOutcome};

use super::run::print_result;
use super::shared::{open_store, orchestrator, page_service};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::{shutdown_flag, shutdown_requested};

pub(crate) async fn handle_watch(
    interval: Option<u64>,
    once: bool,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let pages = page_service(config)?;
    let reporter = Arc::new(ProgressReporter::new());
    let orchestrator = orchestrator(
        config,
        Arc::clone(&store),
        Arc::clone(&pages),
        Some(&reporter),
        None,
    )?;
    let trigger = SyncTrigger::new(
        store as Arc<dyn SyncConfigStore>,
        Arc::new(orchestrator),
        StalenessMonitor::new(pages).with_timeout(config.call_timeout()),
    )
    .with_threshold(config.staleness_threshold());

    let interval = Duration::from_secs(interval.unwrap_or(config.sync.watch_interval_secs).max(1));
    let is_tty = Term::stdout().is_term();
    tracing::info!(interval_secs = interval.as_secs(), "Watching sync configs");

    let trigger = &trigger;
    let reporter = &reporter;
    let evaluate = move || async move {
        let result = trigger.on_event_with_shutdown(Utc::now(), shutdown_flag()).await;
        reporter.finish();
        match result {
            Ok(outcomes) => {
                report(&outcomes, is_tty);
                Ok(())
            }
            Err(e) => {
                if is_tty {
                    eprintln!("{} Could not evaluate sync configs: {}", style("✗").red(), e);
                }
                Err(e)
            }
        }
    };

    run_ticks(interval, once, evaluate, shutdown_requested()).await?;
    Ok(())
}

/// Call `evaluate` once per tick until `stop` resolves.
///
/// A failed evaluation is logged and retried on the next tick; only a
/// single-shot run (`once`) returns it.
async fn run_ticks<F, Fut>(
    interval: Duration,
    once: bool,
    mut evaluate: F,
    stop: impl Future<Output = ()>,
) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = &mut stop => return Ok(()),
        }

        match evaluate().await {
            Ok(()) => {}
            Err(e) if once => return Err(e),
            Err(e) => tracing::error!("Could not evaluate sync configs: {}", e),
        }
        if once {
            return Ok(());
        }
    }
}

fn report(outcomes: &[TriggerOutcome], is_tty: bool) {
    for outcome in outcomes {
        match &outcome.kind {
            OutcomeKind::Ran(result) => {
                if is_tty {
                    println!("{} {}", style("▶").cyan(), style(&outcome.name).bold());
                }
                print_result(result, is_tty);
            }
            OutcomeKind::Failed(e) => {
                if is_tty {
                    println!("{} {}: {}", style("✗").red(), outcome.name, e);
                } else {
                    tracing::error!(config = %outcome.name, "Sync failed: {}", e);
                }
            }
            OutcomeKind::Skipped { reason } => {
                tracing::debug!(config = %outcome.name, reason = %reason, "Skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(300);

    fn store_down() -> StoreError {
        StoreError::NotFound {
            context: "database unavailable".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_is_retried_on_the_next_one() {
        let calls = &AtomicU32::new(0);
        let evaluate = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(store_down())
            } else {
                Ok(())
            }
        };

        let stop = tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1));
        run_ticks(INTERVAL, false, evaluate, stop).await.expect("keeps watching");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_the_wait_between_ticks() {
        let calls = &AtomicU32::new(0);
        let evaluate = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let started = Instant::now();

        run_ticks(INTERVAL, false, evaluate, tokio::time::sleep(Duration::from_secs(10)))
            .await
            .expect("stops cleanly");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn single_shot_returns_the_error() {
        let evaluate = || async { Err(store_down()) };

        let err = run_ticks(INTERVAL, true, evaluate, std::future::pending())
            .await
            .expect_err("once surfaces the failure");

        assert!(err.is_not_found());
    }
}
