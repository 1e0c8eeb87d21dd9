use thiserror::Error;

/// Run-level failures a source provider can report from `fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The remote API could not be reached (transport failure, timeout,
    /// server error, exhausted rate-limit retries).
    #[error("Source unreachable: {message}")]
    Unreachable { message: String },

    /// Credentials were rejected.
    #[error("Source authentication failed: {message}")]
    Auth { message: String },

    /// Repository, branch or path does not exist.
    #[error("Source not found: {resource}")]
    NotFound { resource: String },

    /// The remote answered with something we could not decode.
    #[error("Unexpected source response: {message}")]
    Protocol { message: String },
}

impl SourceError {
    #[inline]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    #[inline]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Why a provider rejected a config. Produced without any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfig {
    #[error("missing required source setting '{key}'")]
    Missing { key: &'static str },

    #[error("source setting '{key}' is invalid: {reason}")]
    Malformed { key: &'static str, reason: String },
}

/// Failure retrieving one item of an otherwise healthy listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {error}")]
pub struct ItemFetchError {
    /// Name of the item that could not be retrieved.
    pub name: String,
    pub error: SourceError,
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps progress output and
/// log lines compact when an error embeds a response body.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
