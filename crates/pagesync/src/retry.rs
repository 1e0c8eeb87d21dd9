//! Backoff for rate-limited source requests.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::sync::{
    INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RATE_LIMIT_RETRIES, ProgressCallback, SyncProgress,
    emit,
};

/// Errors that can tell a rate limit apart from a real failure.
pub trait RateLimited: std::error::Error + Send + Sync + 'static {
    fn is_rate_limited(&self) -> bool;

    /// One-line description for progress output.
    fn summary(&self) -> String {
        self.to_string()
    }
}

/// How long and how often to back off while a source keeps rate limiting us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub first_delay: Duration,
    pub max_delay: Duration,
    /// Retries after the first attempt.
    pub attempts: usize,
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            attempts: MAX_RATE_LIMIT_RETRIES as usize,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(first_delay: Duration, max_delay: Duration, attempts: usize) -> Self {
        Self {
            first_delay,
            max_delay,
            attempts,
            jitter: true,
        }
    }

    #[must_use]
    pub fn without_jitter(self) -> Self {
        Self {
            jitter: false,
            ..self
        }
    }

    fn builder(self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.first_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.attempts);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation`, backing off while it fails with a rate limit.
///
/// Every backoff is emitted as [`SyncProgress::RateLimitBackoff`] for
/// `resource`. Other errors return at once; a rate limit that outlasts the
/// policy is returned unchanged.
pub async fn retry_rate_limited<T, E, F, Fut>(
    mut operation: F,
    policy: BackoffPolicy,
    resource: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimited,
{
    let attempt = AtomicU32::new(0);

    let attempt_once = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    attempt_once
        .retry(policy.builder())
        .when(|e: &E| e.is_rate_limited())
        .notify(|e: &E, wait| {
            let attempt = attempt.load(Ordering::SeqCst);
            tracing::debug!(
                resource,
                attempt,
                wait_ms = wait.as_millis() as u64,
                "Rate limited: {}",
                e.summary()
            );
            emit(
                on_progress,
                SyncProgress::RateLimitBackoff {
                    resource: resource.to_string(),
                    retry_after_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                },
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct Flaky {
        message: &'static str,
        limited: bool,
    }

    impl RateLimited for Flaky {
        fn is_rate_limited(&self) -> bool {
            self.limited
        }
    }

    fn limited() -> Flaky {
        Flaky {
            message: "slow down",
            limited: true,
        }
    }

    #[test]
    fn default_policy_uses_sync_constants() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.first_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(policy.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(policy.attempts, MAX_RATE_LIMIT_RETRIES as usize);
        assert!(policy.jitter);
        assert!(!policy.without_jitter().jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_until_the_limit_clears() {
        let calls = &AtomicU32::new(0);
        let events: Arc<Mutex<Vec<SyncProgress>>> = Arc::default();
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        });

        let result = retry_rate_limited(
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(limited())
                } else {
                    Ok("listing")
                }
            },
            BackoffPolicy::default().without_jitter(),
            "org/repo:docs@main",
            Some(&callback),
        )
        .await;

        assert_eq!(result.expect("third attempt succeeds"), "listing");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                SyncProgress::RateLimitBackoff {
                    resource, attempt, ..
                } if resource == "org/repo:docs@main" => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_the_rate_limit_once_attempts_run_out() {
        let calls = &AtomicU32::new(0);
        let policy =
            BackoffPolicy::new(Duration::from_millis(10), Duration::from_millis(20), 2).without_jitter();

        let err = retry_rate_limited(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(limited())
            },
            policy,
            "org/repo",
            None,
        )
        .await
        .expect_err("limit never clears");

        assert!(err.is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);

        let err = retry_rate_limited(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky {
                    message: "bad credentials",
                    limited: false,
                })
            },
            BackoffPolicy::default(),
            "org/repo",
            None,
        )
        .await
        .expect_err("auth failure");

        assert_eq!(err.to_string(), "bad credentials");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
