//! Thin client for the GitHub contents and git blobs endpoints.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::GitHubError;
use super::types::{Blob, ContentEntry, ContentListing, RepositoryRef};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::rate_limit::ApiRateLimiter;
use crate::retry::{BackoffPolicy, retry_rate_limited};
use crate::sync::ProgressCallback;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// GitHub REST client scoped to one token.
#[derive(Clone)]
pub struct GitHubContentClient {
    transport: Arc<dyn HttpTransport>,
    api_url: Url,
    token: Option<String>,
    rate_limiter: Option<ApiRateLimiter>,
    backoff: BackoffPolicy,
}

impl GitHubContentClient {
    pub fn new_with_transport(
        api_url: &str,
        token: Option<&str>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GitHubError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| GitHubError::Config(format!("invalid API URL '{api_url}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(GitHubError::Config(format!("invalid API URL '{api_url}'")));
        }
        Ok(Self {
            transport,
            api_url,
            token: token.map(str::to_string),
            rate_limiter: None,
            backoff: BackoffPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.into_iter().filter(|s| !s.is_empty()));
        }
        url
    }

    /// URL of the contents endpoint for `path` at `branch`.
    #[must_use]
    pub fn contents_url(&self, repo: &RepositoryRef, path: &str, branch: &str) -> Url {
        let mut url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        );
        url.query_pairs_mut().append_pair("ref", branch);
        url
    }

    #[must_use]
    pub fn blob_url(&self, repo: &RepositoryRef, sha: &str) -> Url {
        self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str(), "git", "blobs", sha])
    }

    /// List a directory, or return the single entry for a file path.
    pub async fn get_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
        branch: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ContentEntry>, GitHubError> {
        let url = self.contents_url(repo, path, branch);
        let resource = format!("{repo}:{path}@{branch}");
        let listing: ContentListing = self.get_with_retry(&url, &resource, on_progress).await?;
        Ok(listing.into_entries())
    }

    pub async fn get_blob(
        &self,
        repo: &RepositoryRef,
        sha: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Blob, GitHubError> {
        let url = self.blob_url(repo, sha);
        let resource = format!("{repo}@{sha}");
        self.get_with_retry(&url, &resource, on_progress).await
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &Url,
        resource: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<T, GitHubError> {
        retry_rate_limited(|| self.get_json(url, resource), self.backoff, resource, on_progress).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        resource: &str,
    ) -> Result<T, GitHubError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let mut request = HttpRequest::get(url.as_str())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", "pagesync");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        tracing::debug!(url = %url, "GitHub request");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        if !response.is_success() {
            return Err(classify_error(&response, resource));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Map a non-2xx response to a [`GitHubError`].
///
/// GitHub reports primary rate limits as 403 with `x-ratelimit-remaining: 0`
/// and secondary limits as 403/429 with `retry-after`.
fn classify_error(response: &HttpResponse, resource: &str) -> GitHubError {
    let message = response.body_text();
    let rate_limited = response.status == 429
        || (response.status == 403
            && (response.header("x-ratelimit-remaining") == Some("0")
                || response.header("retry-after").is_some()
                || message.to_ascii_lowercase().contains("rate limit")));

    if rate_limited {
        return GitHubError::RateLimited {
            reset_at: rate_limit_reset(response),
        };
    }

    match response.status {
        401 | 403 => GitHubError::Auth(format!("HTTP {}: {}", response.status, message)),
        404 => GitHubError::NotFound(resource.to_string()),
        status => GitHubError::Api { status, message },
    }
}

fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let epoch = response.header("x-ratelimit-reset")?.parse::<i64>().ok()?;
    DateTime::from_timestamp(epoch, 0)
}
