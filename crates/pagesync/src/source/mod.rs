//! Content source abstraction.
//!
//! A [`SourceProvider`] turns a [`SyncConfig`] into a lazy [`ContentStream`]
//! of documents. Providers are registered by name in a [`ProviderRegistry`]
//! and resolved from `SyncConfig::provider` at run time.

mod errors;
mod registry;
mod types;

use async_trait::async_trait;

use crate::sync_config::SyncConfig;

pub use errors::{InvalidConfig, ItemFetchError, SourceError, short_error_message};
pub use registry::ProviderRegistry;
pub use types::{ContentCursor, ContentItem, ContentStream};

/// Mime type for markdown documents.
pub const MIME_MARKDOWN: &str = "text/markdown";
/// Mime type for HTML documents.
pub const MIME_HTML: &str = "text/html";

/// A pluggable content source.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// The discriminator this provider registers under, e.g. `"github"`.
    fn name(&self) -> &str;

    /// Check the provider-specific settings of `config` without any I/O.
    fn validate_config(&self, config: &SyncConfig) -> Result<(), InvalidConfig>;

    /// Resolve the listing for `config` and return a stream over the
    /// documents it contains, in listing order.
    ///
    /// Only the listing happens here; each document is retrieved when the
    /// stream is pulled.
    async fn fetch(&self, config: &SyncConfig) -> Result<ContentStream, SourceError>;
}

/// Map a file name to the mime type of a recognized text document.
///
/// Returns `None` for anything that is not markdown or HTML.
#[must_use]
pub fn document_mime_type(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "md" | "markdown" => Some(MIME_MARKDOWN),
        "html" | "htm" => Some(MIME_HTML),
        _ => None,
    }
}
