//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::retry::RateLimited;
use crate::source::SourceError;

/// Errors that can occur when talking to the GitHub contents API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Primary or secondary rate limit hit.
    #[error("Rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Token missing, invalid or lacking access.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Repository, ref or path not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob content could not be decoded.
    #[error("Cannot decode blob {sha}: {message}")]
    Decode { sha: String, message: String },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|t| format!(". Resets at {t}"))
        .unwrap_or_default()
}

impl From<GitHubError> for SourceError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => SourceError::unreachable(message),
            GitHubError::Json(e) => SourceError::protocol(format!("JSON parse error: {e}")),
            GitHubError::Api { status, message } => {
                if status >= 500 {
                    SourceError::unreachable(format!("HTTP {status}: {message}"))
                } else {
                    SourceError::protocol(format!("HTTP {status}: {message}"))
                }
            }
            GitHubError::RateLimited { .. } => {
                SourceError::unreachable("rate limit exceeded after retries")
            }
            GitHubError::Auth(message) => SourceError::auth(message),
            GitHubError::NotFound(resource) => SourceError::not_found(resource),
            GitHubError::Decode { sha, message } => {
                SourceError::protocol(format!("blob {sha}: {message}"))
            }
            GitHubError::Config(message) => SourceError::unreachable(message),
        }
    }
}

impl RateLimited for GitHubError {
    fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            GitHubError::RateLimited { .. } | GitHubError::Api { status: 429, .. }
        )
    }

    fn summary(&self) -> String {
        match self {
            GitHubError::Http(_) => "Network error".to_string(),
            GitHubError::Json(_) => "JSON parse error".to_string(),
            GitHubError::Api { status, message } if message.chars().count() > 50 => {
                let head: String = message.chars().take(47).collect();
                format!("HTTP {status}: {head}...")
            }
            GitHubError::Api { status, message } => format!("HTTP {status}: {message}"),
            GitHubError::RateLimited { .. } => "Rate limited".to_string(),
            GitHubError::Auth(_) => "Authentication failed".to_string(),
            GitHubError::NotFound(resource) => format!("Not found: {resource}"),
            GitHubError::Decode { sha, .. } => format!("Undecodable blob {sha}"),
            GitHubError::Config(message) => format!("Config: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_are_429_or_exhausted_quota() {
        assert!(GitHubError::RateLimited { reset_at: None }.is_rate_limited());
        assert!(
            GitHubError::Api {
                status: 429,
                message: "slow down".into()
            }
            .is_rate_limited()
        );
        assert!(!GitHubError::Auth("bad".into()).is_rate_limited());
        assert!(!GitHubError::NotFound("x".into()).is_rate_limited());
    }

    #[test]
    fn maps_onto_source_errors() {
        assert!(matches!(
            SourceError::from(GitHubError::Auth("Bad credentials".into())),
            SourceError::Auth { .. }
        ));
        assert_eq!(
            SourceError::from(GitHubError::NotFound("org/repo:docs@main".into())),
            SourceError::not_found("org/repo:docs@main")
        );
        assert!(matches!(
            SourceError::from(GitHubError::Api {
                status: 502,
                message: "bad gateway".into()
            }),
            SourceError::Unreachable { .. }
        ));
        assert!(matches!(
            SourceError::from(GitHubError::RateLimited { reset_at: None }),
            SourceError::Unreachable { .. }
        ));
        assert!(matches!(
            SourceError::from(GitHubError::Http("connection refused".into())),
            SourceError::Unreachable { .. }
        ));
    }

    #[test]
    fn summary_truncates_long_api_messages() {
        let err = GitHubError::Api {
            status: 422,
            message: "x".repeat(80),
        };
        let short = err.summary();
        assert!(short.starts_with("HTTP 422: "));
        assert!(short.ends_with("..."));
        assert!(short.len() < 70);
    }

    #[test]
    fn rate_limited_display() {
        assert_eq!(
            GitHubError::RateLimited { reset_at: None }.to_string(),
            "Rate limit exceeded"
        );
    }
}
