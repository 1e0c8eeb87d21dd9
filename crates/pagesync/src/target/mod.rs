//! The target document service content is synced into.

#[cfg(feature = "docmost")]
pub mod docmost;
mod errors;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::ContentItem;

#[cfg(feature = "docmost")]
pub use docmost::DocmostClient;
pub use errors::TargetError;
pub use memory::MemoryPageService;

/// A page created by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub space_id: String,
}

/// One entry of a space's recent-changes listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChange {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Page operations the sync engine and staleness monitor rely on.
#[async_trait]
pub trait PageService: Send + Sync {
    /// Import one document as a new page.
    async fn import_content(
        &self,
        item: &ContentItem,
        space_id: &str,
        parent_page_id: Option<&str>,
    ) -> Result<PageRef, TargetError>;

    async fn delete_page(&self, page_id: &str) -> Result<(), TargetError>;

    /// Every page in the space, in whatever order the service returns them.
    async fn list_recent_changes(&self, space_id: &str) -> Result<Vec<RecentChange>, TargetError>;

    /// The most recent modification in the space, `None` when it is empty.
    ///
    /// The listing order is not trusted; the maximum `updated_at` wins.
    async fn latest_change(&self, space_id: &str) -> Result<Option<DateTime<Utc>>, TargetError> {
        let changes = self.list_recent_changes(space_id).await?;
        Ok(changes.iter().map(|c| c.updated_at).max())
    }
}
