use pagesync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::ListingTarget { config, space_id } => {
                tracing::info!(config = %config, space_id = %space_id, "Listing target space");
            }

            SyncProgress::TargetListed { space_id, pages } => {
                tracing::info!(space_id = %space_id, pages, "Target space listed");
            }

            SyncProgress::DeletingPages { count } => {
                tracing::info!(count, "Deleting existing pages");
            }

            SyncProgress::DeletedPage { page_id, title } => {
                tracing::debug!(page_id = %page_id, title = ?title, "Deleted page");
            }

            SyncProgress::DeleteError { page_id, error } => {
                tracing::warn!(page_id = %page_id, error = %error, "Failed to delete page");
            }

            SyncProgress::FetchingSource { provider } => {
                tracing::info!(provider = %provider, "Fetching source listing");
            }

            SyncProgress::SourceListed { count } => {
                tracing::info!(count, "Source listed");
            }

            SyncProgress::ImportedItem { name, page_id } => {
                tracing::debug!(item = %name, page_id = %page_id, "Imported");
            }

            SyncProgress::ImportError { name, error } => {
                tracing::warn!(item = %name, error = %error, "Failed to import");
            }

            SyncProgress::RateLimitBackoff {
                resource,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    resource = %resource,
                    retry_after_ms,
                    attempt,
                    "Rate limited, backing off"
                );
            }

            SyncProgress::Cancelled {
                imported,
                remaining,
            } => {
                tracing::warn!(imported, remaining, "Sync cancelled");
            }

            SyncProgress::SyncComplete {
                imported,
                deleted,
                errors,
            } => {
                tracing::info!(imported, deleted, errors, "Sync complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
