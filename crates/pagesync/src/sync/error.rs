use thiserror::Error;
use uuid::Uuid;

use super::types::PartialProgress;
use crate::source::{InvalidConfig, SourceError};
use crate::target::TargetError;

/// Why a config cannot be acted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigProblem {
    #[error("no source provider registered as '{provider}'")]
    UnknownProvider { provider: String },

    #[error(transparent)]
    Rejected(#[from] InvalidConfig),
}

/// Run-level failures. Each one ends the run; item-level failures are
/// collected in [`SyncResult::item_errors`](super::SyncResult) instead.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("sync config {config_id} is disabled")]
    Disabled { config_id: Uuid },

    #[error("sync config {config_id} is invalid: {problem}")]
    ConfigInvalid {
        config_id: Uuid,
        problem: ConfigProblem,
    },

    #[error("sync config {config_id} is already running")]
    AlreadyRunning { config_id: Uuid },

    /// The target space could not be listed. Nothing was changed.
    #[error("cannot list target space: {error}")]
    Target { error: TargetError },

    /// The source listing failed after the delete step.
    #[error("cannot fetch source content: {error}")]
    Source {
        error: SourceError,
        /// Deletes performed before the failure.
        partial: PartialProgress,
    },
}

impl SyncError {
    /// Deletes that happened before a source failure, if any.
    #[must_use]
    pub fn partial(&self) -> Option<&PartialProgress> {
        match self {
            SyncError::Source { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// True when the run deleted pages and then failed, leaving the target
    /// space partially cleared.
    #[must_use]
    pub fn target_partially_cleared(&self) -> bool {
        self.partial().is_some_and(|p| p.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_is_only_reported_for_source_failures() {
        let err = SyncError::Source {
            error: SourceError::unreachable("timeout"),
            partial: PartialProgress {
                deleted_count: 2,
                item_errors: Vec::new(),
            },
        };
        assert!(err.target_partially_cleared());
        assert_eq!(err.partial().map(|p| p.deleted_count), Some(2));

        let err = SyncError::Target {
            error: TargetError::unavailable("down"),
        };
        assert!(err.partial().is_none());
        assert!(!err.target_partially_cleared());
    }

    #[test]
    fn config_invalid_display_names_the_problem() {
        let err = SyncError::ConfigInvalid {
            config_id: Uuid::nil(),
            problem: ConfigProblem::Rejected(InvalidConfig::Missing { key: "branch" }),
        };
        assert!(err.to_string().contains("missing required source setting 'branch'"));
    }
}
