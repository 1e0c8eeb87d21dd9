//! The `github` source provider.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{DEFAULT_API_URL, GitHubContentClient};
use super::error::GitHubError;
use super::types::{ContentEntry, GitHubSource, RepositoryRef};
use crate::http::HttpTransport;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS};
use crate::retry::BackoffPolicy;
use crate::source::{
    ContentCursor, ContentItem, ContentStream, InvalidConfig, ItemFetchError, SourceError,
    SourceProvider, document_mime_type,
};
use crate::sync::ProgressCallback;
use crate::sync_config::{ACCESS_TOKEN_KEY, SyncConfig};

/// Discriminator the provider registers under.
pub const GITHUB_PROVIDER: &str = "github";

/// Explicit settings for the GitHub provider.
#[derive(Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    /// Used when a config carries no `accessToken` credential.
    pub default_token: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub requests_per_second: u32,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            default_token: None,
            timeout: Duration::from_secs(30),
            requests_per_second: GITHUB_DEFAULT_RPS,
        }
    }
}

impl std::fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("api_url", &self.api_url)
            .field("default_token", &self.default_token.as_ref().map(|_| "********"))
            .field("timeout", &self.timeout)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

/// Pulls markdown and HTML documents from one directory of a GitHub repository.
pub struct GitHubProvider {
    settings: GitHubSettings,
    transport: Arc<dyn HttpTransport>,
    rate_limiter: ApiRateLimiter,
    backoff: BackoffPolicy,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl GitHubProvider {
    pub fn new(settings: GitHubSettings) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(settings.timeout)
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(settings, Arc::new(transport)))
    }

    pub fn new_with_transport(settings: GitHubSettings, transport: Arc<dyn HttpTransport>) -> Self {
        let rate_limiter = ApiRateLimiter::new(settings.requests_per_second);
        Self {
            settings,
            transport,
            rate_limiter,
            backoff: BackoffPolicy::default(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Report rate-limit backoffs through `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// The config's own token wins over the provider default.
    fn token_for<'a>(&'a self, config: &'a SyncConfig) -> Option<&'a str> {
        config
            .credentials
            .get(ACCESS_TOKEN_KEY)
            .or(self.settings.default_token.as_deref())
    }

    fn client_for(&self, config: &SyncConfig) -> Result<GitHubContentClient, GitHubError> {
        Ok(GitHubContentClient::new_with_transport(
            &self.settings.api_url,
            self.token_for(config),
            Arc::clone(&self.transport),
        )?
        .with_rate_limiter(self.rate_limiter.clone())
        .with_backoff(self.backoff))
    }
}

#[async_trait]
impl SourceProvider for GitHubProvider {
    fn name(&self) -> &str {
        GITHUB_PROVIDER
    }

    fn validate_config(&self, config: &SyncConfig) -> Result<(), InvalidConfig> {
        GitHubSource::from_config(config).map(|_| ())
    }

    async fn fetch(&self, config: &SyncConfig) -> Result<ContentStream, SourceError> {
        let source = GitHubSource::from_config(config)
            .map_err(|e| SourceError::protocol(format!("invalid source config: {e}")))?;
        let client = self.client_for(config)?;

        let entries = client
            .get_content(
                &source.repository,
                &source.path,
                &source.branch,
                self.on_progress.as_deref(),
            )
            .await?;
        let total = entries.len();

        let pending: VecDeque<(ContentEntry, &'static str)> = entries
            .into_iter()
            .filter(ContentEntry::is_file)
            .filter_map(|entry| document_mime_type(&entry.name).map(|mime| (entry, mime)))
            .collect();

        tracing::debug!(
            source = %source.label(),
            listed = total,
            documents = pending.len(),
            "Resolved GitHub listing"
        );

        Ok(ContentStream::new(GitHubContentCursor {
            client,
            repository: source.repository,
            pending,
            on_progress: self.on_progress.clone(),
        }))
    }
}

/// Fetches one blob per pull.
struct GitHubContentCursor {
    client: GitHubContentClient,
    repository: RepositoryRef,
    pending: VecDeque<(ContentEntry, &'static str)>,
    on_progress: Option<Arc<ProgressCallback>>,
}

#[async_trait]
impl ContentCursor for GitHubContentCursor {
    async fn next_item(&mut self) -> Option<Result<ContentItem, ItemFetchError>> {
        let (entry, mime) = self.pending.pop_front()?;

        let result = match self
            .client
            .get_blob(&self.repository, &entry.sha, self.on_progress.as_deref())
            .await
        {
            Ok(blob) => blob.decode(),
            Err(e) => Err(e),
        };

        Some(
            result
                .map(|bytes| ContentItem::new(entry.name.clone(), bytes, mime))
                .map_err(|e| ItemFetchError {
                    name: entry.name,
                    error: e.into(),
                }),
        )
    }

    fn pending_names(&self) -> Vec<String> {
        self.pending.iter().map(|(e, _)| e.name.clone()).collect()
    }

    fn peek_name(&self) -> Option<&str> {
        self.pending.front().map(|(e, _)| e.name.as_str())
    }

    fn remaining(&self) -> usize {
        self.pending.len()
    }
}
