//! Staleness checks against a target space.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::sync::DEFAULT_CALL_TIMEOUT;
use crate::target::{PageService, TargetError};

/// A space untouched for longer than this many hours is due for a sync.
pub const DEFAULT_STALENESS_HOURS: i64 = 24;

#[must_use]
pub fn default_threshold() -> Duration {
    Duration::hours(DEFAULT_STALENESS_HOURS)
}

/// The outcome of a staleness check.
#[derive(Debug, Clone, PartialEq)]
pub enum Staleness {
    /// The newest change is older than the threshold.
    Stale { last_modified: DateTime<Utc> },
    /// The space has no pages.
    Empty,
    Fresh { last_modified: DateTime<Utc> },
    /// The space could not be listed.
    Unknown(TargetError),
}

impl Staleness {
    /// True for `Stale` and `Empty`. `Unknown` is not stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. } | Self::Empty)
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Stale { last_modified } | Self::Fresh { last_modified } => Some(*last_modified),
            Self::Empty | Self::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stale { last_modified } => write!(f, "stale (last change {last_modified})"),
            Self::Empty => write!(f, "empty"),
            Self::Fresh { last_modified } => write!(f, "fresh (last change {last_modified})"),
            Self::Unknown(e) => write!(f, "unknown ({e})"),
        }
    }
}

/// Decide staleness from the newest modification time.
///
/// Stale iff `now - latest > threshold`.
#[must_use]
pub fn evaluate(latest: Option<DateTime<Utc>>, threshold: Duration, now: DateTime<Utc>) -> Staleness {
    match latest {
        None => Staleness::Empty,
        Some(last_modified) if now - last_modified > threshold => Staleness::Stale { last_modified },
        Some(last_modified) => Staleness::Fresh { last_modified },
    }
}

/// Reads a space's newest modification time and compares it to a threshold.
#[derive(Clone)]
pub struct StalenessMonitor {
    pages: Arc<dyn PageService>,
    timeout: std::time::Duration,
}

impl StalenessMonitor {
    pub fn new(pages: Arc<dyn PageService>) -> Self {
        Self {
            pages,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound on the listing behind each check. A listing that outlasts it is
    /// reported as [`Staleness::Unknown`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn check(&self, space_id: &str, threshold: Duration) -> Staleness {
        self.check_at(space_id, threshold, Utc::now()).await
    }

    /// [`check`](Self::check) against an explicit clock.
    pub async fn check_at(&self, space_id: &str, threshold: Duration, now: DateTime<Utc>) -> Staleness {
        let latest = tokio::time::timeout(self.timeout, self.pages.latest_change(space_id))
            .await
            .unwrap_or_else(|_| {
                Err(TargetError::unavailable(format!(
                    "listing timed out after {:?}",
                    self.timeout
                )))
            });
        match latest {
            Ok(latest) => {
                let staleness = evaluate(latest, threshold, now);
                tracing::debug!(space_id, %staleness, "Checked staleness");
                staleness
            }
            Err(e) => {
                tracing::warn!(space_id, "Could not determine staleness: {}", e);
                Staleness::Unknown(e)
            }
        }
    }

    pub async fn is_stale(&self, space_id: &str, threshold: Duration) -> bool {
        self.check(space_id, threshold).await.is_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MemoryPageService;

    fn monitor_with(pages: &Arc<MemoryPageService>) -> StalenessMonitor {
        StalenessMonitor::new(Arc::clone(pages) as Arc<dyn PageService>)
    }

    #[tokio::test]
    async fn day_old_space_is_stale() {
        let pages = Arc::new(MemoryPageService::new());
        pages.seed_page("s1", "old", Utc::now() - Duration::hours(25));

        assert!(monitor_with(&pages).is_stale("s1", default_threshold()).await);
    }

    #[tokio::test]
    async fn recently_changed_space_is_fresh() {
        let pages = Arc::new(MemoryPageService::new());
        pages.seed_page("s1", "old", Utc::now() - Duration::hours(30));
        pages.seed_page("s1", "new", Utc::now() - Duration::hours(1));

        let monitor = monitor_with(&pages);
        assert!(!monitor.is_stale("s1", default_threshold()).await);
        assert!(matches!(
            monitor.check("s1", default_threshold()).await,
            Staleness::Fresh { .. }
        ));
    }

    #[tokio::test]
    async fn empty_space_is_stale() {
        let pages = Arc::new(MemoryPageService::new());
        let monitor = monitor_with(&pages);

        assert_eq!(monitor.check("s1", default_threshold()).await, Staleness::Empty);
        assert!(monitor.is_stale("s1", default_threshold()).await);
    }

    #[tokio::test]
    async fn listing_failure_is_unknown_not_fresh() {
        let pages = Arc::new(MemoryPageService::new());
        pages.fail_listing(Some(TargetError::unavailable("503")));
        let monitor = monitor_with(&pages);

        let staleness = monitor.check("s1", default_threshold()).await;
        assert!(matches!(staleness, Staleness::Unknown(TargetError::Unavailable { .. })));
        assert!(!staleness.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_listing_is_unknown_after_timeout() {
        let pages = Arc::new(
            MemoryPageService::new().with_latency(std::time::Duration::from_secs(60)),
        );
        pages.seed_page("s1", "old", Utc::now() - Duration::hours(25));
        let monitor = monitor_with(&pages).with_timeout(std::time::Duration::from_secs(5));

        let staleness = monitor.check("s1", default_threshold()).await;

        assert!(matches!(staleness, Staleness::Unknown(TargetError::Unavailable { .. })));
        assert!(!monitor.is_stale("s1", default_threshold()).await);
    }

    #[test]
    fn evaluate_uses_strict_comparison() {
        let now = Utc::now();
        let threshold = Duration::hours(24);

        let exactly = now - threshold;
        assert_eq!(
            evaluate(Some(exactly), threshold, now),
            Staleness::Fresh { last_modified: exactly }
        );
        let older = exactly - Duration::seconds(1);
        assert_eq!(
            evaluate(Some(older), threshold, now),
            Staleness::Stale { last_modified: older }
        );
        assert_eq!(evaluate(None, threshold, now), Staleness::Empty);
    }
}
