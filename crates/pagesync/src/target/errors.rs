use thiserror::Error;

use crate::http::HttpError;

/// Failures reported by a [`PageService`](super::PageService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The page service could not be reached or answered with a 5xx.
    #[error("Page service unavailable: {message}")]
    Unavailable { message: String },

    /// The service rejected our credentials.
    #[error("Page service authentication failed: {message}")]
    Auth { message: String },

    /// Page or space does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The service refused the request (4xx other than auth/not found).
    #[error("Page service rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response could not be decoded.
    #[error("Unexpected page service response: {message}")]
    Protocol { message: String },
}

impl TargetError {
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
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
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16, resource: &str, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!("HTTP {status}: {body}")),
            404 => Self::not_found(resource),
            500.. => Self::unavailable(format!("HTTP {status}: {body}")),
            _ => Self::rejected(status, body),
        }
    }
}

impl From<HttpError> for TargetError {
    fn from(e: HttpError) -> Self {
        Self::unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_classifies_responses() {
        assert!(matches!(
            TargetError::from_status(401, "space s1", "no"),
            TargetError::Auth { .. }
        ));
        assert_eq!(
            TargetError::from_status(404, "page p1", ""),
            TargetError::not_found("page p1")
        );
        assert!(matches!(
            TargetError::from_status(502, "x", "bad gateway"),
            TargetError::Unavailable { .. }
        ));
        assert_eq!(
            TargetError::from_status(422, "x", "invalid file"),
            TargetError::rejected(422, "invalid file")
        );
    }

    #[test]
    fn http_errors_are_unavailable() {
        let err: TargetError = HttpError::Timeout("30s".into()).into();
        assert!(matches!(err, TargetError::Unavailable { .. }));
    }
}
