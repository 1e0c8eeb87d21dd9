//! GitHub source provider.
//!
//! Lists one directory of a repository through the contents API and pulls
//! each markdown or HTML file through the git blobs API.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and their mapping onto [`SourceError`](crate::source::SourceError)
//! - [`types`] - API payloads and validated source settings
//! - [`client`] - Rate-limited, retrying REST client
//! - [`provider`] - The [`SourceProvider`](crate::source::SourceProvider) implementation

mod client;
pub mod error;
mod provider;
mod types;

pub use client::{DEFAULT_API_URL, GitHubContentClient};
pub use error::GitHubError;
pub use provider::{GITHUB_PROVIDER, GitHubProvider, GitHubSettings};
pub use types::{Blob, ContentEntry, ContentListing, GitHubSource, RepositoryRef};
