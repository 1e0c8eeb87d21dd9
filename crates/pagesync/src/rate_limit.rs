//! Proactive request pacing for source APIs.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour for authenticated users; 10/sec leaves
/// room for bursts on a single listing.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// A cloneable handle on a shared governor rate limiter.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// client.get_content(&repo, "docs", "main").await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// A limiter allowing `requests_per_second` (0 is treated as 1).
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until another request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_rps_falls_back_to_one() {
        let limiter = ApiRateLimiter::new(0);
        // The first request is always admitted.
        limiter.wait().await;
    }

    #[tokio::test]
    async fn clones_share_the_same_budget() {
        let limiter = ApiRateLimiter::new(100);
        let clone = limiter.clone();
        limiter.wait().await;
        clone.wait().await;
        assert!(Arc::ptr_eq(&limiter.inner, &clone.inner));
    }
}
