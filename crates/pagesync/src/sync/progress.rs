//! Progress reporting for sync runs.
//!
//! The engine reports what it is doing through an optional callback so the
//! CLI can draw progress bars or log lines without the engine knowing which.

/// Progress events emitted during a sync run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Listing the pages currently in the target space.
    ListingTarget {
        /// Config being synced.
        config: String,
        space_id: String,
    },

    /// Target listing finished.
    TargetListed {
        space_id: String,
        /// Pages found in the space.
        pages: usize,
    },

    /// Starting to delete existing pages.
    DeletingPages {
        /// Pages in delete scope.
        count: usize,
    },

    /// Deleted a single page.
    DeletedPage {
        page_id: String,
        title: Option<String>,
    },

    /// Failed to delete a page (non-fatal).
    DeleteError { page_id: String, error: String },

    /// Asking the provider for its listing.
    FetchingSource {
        /// Provider discriminator.
        provider: String,
    },

    /// Provider listing resolved.
    SourceListed {
        /// Documents that will be imported.
        count: usize,
    },

    /// Imported a single document.
    ImportedItem { name: String, page_id: String },

    /// Failed to import a document (non-fatal).
    ImportError { name: String, error: String },

    /// Rate limited by the source, backing off before retry.
    RateLimitBackoff {
        /// What was being requested, e.g. `org/repo:docs`.
        resource: String,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        /// Current attempt number.
        attempt: u32,
    },

    /// Shutdown was requested; the run stopped at an item boundary.
    Cancelled {
        imported: usize,
        /// Items left unprocessed.
        remaining: usize,
    },

    /// Run finished.
    SyncComplete {
        imported: usize,
        deleted: usize,
        errors: usize,
    },
}

/// Callback for progress updates during sync runs.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
