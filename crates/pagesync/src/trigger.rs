//! Automatic sync triggering.
//!
//! An external event (a timer tick, a space being opened) asks the trigger to
//! evaluate configs. A config runs when its schedule fired since its last
//! sync, or when its target space is stale or empty.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::staleness::{Staleness, StalenessMonitor, default_threshold};
use crate::store::{StoreError, SyncConfigStore};
use crate::sync::{SyncError, SyncOrchestrator, SyncResult};
use crate::sync_config::SyncConfig;

/// What happened to one config during a trigger evaluation.
#[derive(Debug)]
pub struct TriggerOutcome {
    pub config_id: Uuid,
    pub name: String,
    pub kind: OutcomeKind,
}

#[derive(Debug)]
pub enum OutcomeKind {
    Ran(SyncResult),
    Failed(SyncError),
    Skipped { reason: String },
}

impl TriggerOutcome {
    fn new(config: &SyncConfig, kind: OutcomeKind) -> Self {
        Self {
            config_id: config.id,
            name: config.name.clone(),
            kind,
        }
    }

    #[must_use]
    pub fn ran(&self) -> bool {
        matches!(self.kind, OutcomeKind::Ran(_))
    }
}

/// Runs due configs through a shared orchestrator.
pub struct SyncTrigger {
    store: Arc<dyn SyncConfigStore>,
    orchestrator: Arc<SyncOrchestrator>,
    monitor: StalenessMonitor,
    threshold: Duration,
}

impl SyncTrigger {
    pub fn new(
        store: Arc<dyn SyncConfigStore>,
        orchestrator: Arc<SyncOrchestrator>,
        monitor: StalenessMonitor,
    ) -> Self {
        Self {
            store,
            orchestrator,
            monitor,
            threshold: default_threshold(),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Evaluate every config.
    pub async fn on_event(&self, now: DateTime<Utc>) -> Result<Vec<TriggerOutcome>, StoreError> {
        let never = AtomicBool::new(false);
        self.on_event_with_shutdown(now, &never).await
    }

    /// Evaluate every config, stopping between configs once `shutdown` is set.
    pub async fn on_event_with_shutdown(
        &self,
        now: DateTime<Utc>,
        shutdown: &AtomicBool,
    ) -> Result<Vec<TriggerOutcome>, StoreError> {
        let configs = self.store.list().await?;
        Ok(self.evaluate_all(configs, now, shutdown).await)
    }

    /// Evaluate the configs targeting `space_id`.
    pub async fn on_space_event(
        &self,
        space_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TriggerOutcome>, StoreError> {
        let configs = self.store.list_for_space(space_id).await?;
        let never = AtomicBool::new(false);
        Ok(self.evaluate_all(configs, now, &never).await)
    }

    async fn evaluate_all(
        &self,
        configs: Vec<SyncConfig>,
        now: DateTime<Utc>,
        shutdown: &AtomicBool,
    ) -> Vec<TriggerOutcome> {
        let mut outcomes = Vec::with_capacity(configs.len());
        for config in configs {
            if shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                break;
            }
            outcomes.push(self.evaluate(&config, now, shutdown).await);
        }
        outcomes
    }

    async fn evaluate(&self, config: &SyncConfig, now: DateTime<Utc>, shutdown: &AtomicBool) -> TriggerOutcome {
        if !config.enabled {
            return TriggerOutcome::new(config, skipped("disabled"));
        }

        let due = match self.due(config, now).await {
            Ok(Some(due)) => due,
            Ok(None) => return TriggerOutcome::new(config, skipped("not due")),
            Err(reason) => return TriggerOutcome::new(config, OutcomeKind::Skipped { reason }),
        };

        tracing::info!(config = %config.name, reason = due, "Triggering sync");
        let kind = match self.orchestrator.run_with_shutdown(config, shutdown).await {
            Ok(result) => OutcomeKind::Ran(result),
            Err(e) => {
                tracing::warn!(config = %config.name, "Triggered sync failed: {}", e);
                OutcomeKind::Failed(e)
            }
        };
        TriggerOutcome::new(config, kind)
    }

    /// The reason `config` is due, or `Err` with a skip reason.
    async fn due(&self, config: &SyncConfig, now: DateTime<Utc>) -> Result<Option<&'static str>, String> {
        if !config.schedule.trim().is_empty() {
            match config.cron_schedule() {
                Some(schedule) if schedule.is_due(config.last_sync, now) => return Ok(Some("schedule")),
                Some(_) => {}
                None => return Err(format!("invalid schedule {:?}", config.schedule)),
            }
        }

        let staleness = self
            .monitor
            .check_at(&config.target_config.space_id, self.threshold, now)
            .await;
        match staleness {
            Staleness::Unknown(e) => Err(format!("staleness unknown: {e}")),
            Staleness::Empty => Ok(Some("empty")),
            Staleness::Stale { .. } => Ok(Some("stale")),
            Staleness::Fresh { .. } => Ok(None),
        }
    }
}

fn skipped(reason: &str) -> OutcomeKind {
    OutcomeKind::Skipped {
        reason: reason.to_string(),
    }
}
