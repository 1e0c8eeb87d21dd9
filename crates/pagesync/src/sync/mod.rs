//! The content synchronization engine.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncResult`, `SyncOptions`, item errors, constants
//! - [`progress`] - `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`error`] - Run-level `SyncError`
//! - [`lock`] - Per-config run locks
//! - [`engine`] - `SyncOrchestrator`

pub mod engine;
mod error;
mod lock;
mod progress;
mod types;

pub use engine::SyncOrchestrator;
pub use error::{ConfigProblem, SyncError};
pub use lock::{RunGuard, RunLocks};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{
    DeleteScope, ItemError, ItemErrorKind, LockPolicy, PartialProgress, SyncOptions, SyncResult,
};

pub use types::{DEFAULT_CALL_TIMEOUT, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RATE_LIMIT_RETRIES};
