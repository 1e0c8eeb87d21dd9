use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::sync_config::ConfigValidationError;

/// Errors from a [`SyncConfigStore`](super::SyncConfigStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Sync config not found: {context}")]
    NotFound { context: String },

    /// Input failed validation; nothing was written.
    #[error("Invalid sync config: {0}")]
    Invalid(#[from] ConfigValidationError),

    /// A stored row could not be turned back into a config.
    #[error("Corrupt sync config {id}: {message}")]
    Corrupt { id: Uuid, message: String },
}

impl StoreError {
    pub fn not_found_by_id(id: Uuid) -> Self {
        Self::NotFound {
            context: format!("id={id}"),
        }
    }

    pub fn not_found_by_name(name: &str) -> Self {
        Self::NotFound {
            context: format!("name={name}"),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
