//! Shared sync types and constants.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::PageRef;

/// Default bound on every collaborator call made by a run.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum backoff delay in milliseconds when rate limited.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum retries for a rate-limited source request.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Which existing pages a run deletes before importing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    /// Every page listed in the target space.
    #[default]
    AllPages,
    /// Only pages created by this config's previous run.
    SyncedPages,
}

impl fmt::Display for DeleteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeleteScope::AllPages => "all_pages",
            DeleteScope::SyncedPages => "synced_pages",
        })
    }
}

impl FromStr for DeleteScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_pages" | "all" => Ok(DeleteScope::AllPages),
            "synced_pages" | "synced" => Ok(DeleteScope::SyncedPages),
            other => Err(format!(
                "unknown delete scope '{other}' (expected all_pages or synced_pages)"
            )),
        }
    }
}

/// What a second run of a config does while the first is still in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockPolicy {
    /// Fail immediately with `SyncError::AlreadyRunning`.
    #[default]
    Reject,
    /// Queue behind the running one.
    Wait,
}

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Bound on each listing, delete, import, fetch and item pull.
    pub call_timeout: Duration,
    pub delete_scope: DeleteScope,
    pub lock_policy: LockPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            delete_scope: DeleteScope::default(),
            lock_policy: LockPolicy::default(),
        }
    }
}

/// Which step of a run an item-level failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemErrorKind {
    DeleteFailed,
    ImportFailed,
}

impl fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemErrorKind::DeleteFailed => "delete failed",
            ItemErrorKind::ImportFailed => "import failed",
        })
    }
}

/// A single non-fatal failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Page id for deletes, file name for imports.
    pub item: String,
    pub kind: ItemErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn delete(page_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: page_id.into(),
            kind: ItemErrorKind::DeleteFailed,
            message: message.into(),
        }
    }

    pub fn import(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: name.into(),
            kind: ItemErrorKind::ImportFailed,
            message: message.into(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.item, self.kind, self.message)
    }
}

/// Outcome of a sync run that got past the run-level checks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub config_id: Uuid,
    /// Documents imported.
    pub imported_count: usize,
    /// Pages deleted.
    pub deleted_count: usize,
    /// Non-fatal failures, in the order they happened.
    pub item_errors: Vec<ItemError>,
    /// Every page created by this run, in import order.
    pub imported_pages: Vec<PageRef>,
    /// The last successfully imported page, if any.
    pub last_imported: Option<PageRef>,
    /// Shutdown stopped the run before the stream was drained.
    pub cancelled: bool,
    /// Completion time, set once the source listing succeeded.
    pub last_sync: Option<DateTime<Utc>>,
    /// Set when `last_sync` could not be written back to the store.
    pub last_sync_error: Option<String>,
}

impl SyncResult {
    pub(crate) fn new(config_id: Uuid) -> Self {
        Self {
            config_id,
            ..Default::default()
        }
    }

    /// True when every delete and import succeeded and the run finished.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.item_errors.is_empty() && !self.cancelled && self.last_sync_error.is_none()
    }

    /// Item errors of one kind.
    pub fn errors_of(&self, kind: ItemErrorKind) -> impl Iterator<Item = &ItemError> {
        self.item_errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Deletes already performed when a run aborted after mutating the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialProgress {
    pub deleted_count: usize,
    pub item_errors: Vec<ItemError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_options_default() {
        let options = SyncOptions::default();
        assert_eq!(options.call_timeout, Duration::from_secs(30));
        assert_eq!(options.delete_scope, DeleteScope::AllPages);
        assert_eq!(options.lock_policy, LockPolicy::Reject);
    }

    #[test]
    fn test_delete_scope_parse() {
        assert_eq!("all_pages".parse(), Ok(DeleteScope::AllPages));
        assert_eq!("synced-pages".parse(), Ok(DeleteScope::SyncedPages));
        assert_eq!("Synced".parse(), Ok(DeleteScope::SyncedPages));
        assert!("everything".parse::<DeleteScope>().is_err());
        assert_eq!(DeleteScope::SyncedPages.to_string(), "synced_pages");
    }

    #[test]
    fn test_sync_result_is_clean() {
        let mut result = SyncResult::new(Uuid::new_v4());
        assert!(result.is_clean());

        result.item_errors.push(ItemError::delete("p1", "gone"));
        assert!(!result.is_clean());
        assert_eq!(result.errors_of(ItemErrorKind::DeleteFailed).count(), 1);
        assert_eq!(result.errors_of(ItemErrorKind::ImportFailed).count(), 0);
    }

    #[test]
    fn test_item_error_display() {
        let err = ItemError::import("a.md", "HTTP 500");
        assert_eq!(err.to_string(), "a.md (import failed): HTTP 500");
    }
}
