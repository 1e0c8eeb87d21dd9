//! In-process page service.
//!
//! Keeps pages in memory, records every call in order and can be told to fail
//! specific operations. Used by tests and as the inert target of `pagesync check`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{PageRef, PageService, RecentChange, TargetError};
use crate::source::ContentItem;

/// One recorded call against a [`MemoryPageService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    List { space_id: String },
    Delete { page_id: String },
    Import {
        name: String,
        space_id: String,
        parent_page_id: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct StoredPage {
    id: String,
    title: String,
    space_id: String,
    parent_page_id: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    pages: BTreeMap<String, StoredPage>,
    next_id: u64,
    calls: Vec<PageCall>,
    failing_deletes: HashSet<String>,
    failing_imports: HashSet<String>,
    listing_error: Option<TargetError>,
}

/// A [`PageService`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryPageService {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl MemoryPageService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call, so concurrent callers can overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Insert an existing page and return its id.
    pub fn seed_page(&self, space_id: &str, title: &str, updated_at: DateTime<Utc>) -> String {
        let mut inner = self.lock();
        let id = next_page_id(&mut inner);
        inner.pages.insert(
            id.clone(),
            StoredPage {
                id: id.clone(),
                title: title.to_string(),
                space_id: space_id.to_string(),
                parent_page_id: None,
                updated_at,
            },
        );
        id
    }

    /// Make every delete of `page_id` fail.
    pub fn fail_delete(&self, page_id: impl Into<String>) {
        self.lock().failing_deletes.insert(page_id.into());
    }

    /// Make every import of an item named `name` fail.
    pub fn fail_import(&self, name: impl Into<String>) {
        self.lock().failing_imports.insert(name.into());
    }

    /// Make listings fail with `error` until cleared with `None`.
    pub fn fail_listing(&self, error: Option<TargetError>) {
        self.lock().listing_error = error;
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PageCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Titles of the pages in a space, sorted.
    #[must_use]
    pub fn titles(&self, space_id: &str) -> Vec<String> {
        let mut titles: Vec<String> = self
            .lock()
            .pages
            .values()
            .filter(|p| p.space_id == space_id)
            .map(|p| p.title.clone())
            .collect();
        titles.sort();
        titles
    }

    /// Page ids in a space, sorted.
    #[must_use]
    pub fn page_ids(&self, space_id: &str) -> Vec<String> {
        self.lock()
            .pages
            .values()
            .filter(|p| p.space_id == space_id)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Parent of a page, if the page exists and has one.
    #[must_use]
    pub fn parent_of(&self, page_id: &str) -> Option<String> {
        self.lock()
            .pages
            .get(page_id)
            .and_then(|p| p.parent_page_id.clone())
    }
}

fn next_page_id(inner: &mut Inner) -> String {
    inner.next_id += 1;
    format!("page-{}", inner.next_id)
}

/// Page title a document import produces: the file name without extension.
#[must_use]
pub fn title_from_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

#[async_trait]
impl PageService for MemoryPageService {
    async fn import_content(
        &self,
        item: &ContentItem,
        space_id: &str,
        parent_page_id: Option<&str>,
    ) -> Result<PageRef, TargetError> {
        self.lock().calls.push(PageCall::Import {
            name: item.name.clone(),
            space_id: space_id.to_string(),
            parent_page_id: parent_page_id.map(str::to_string),
        });
        self.pause().await;

        let mut inner = self.lock();
        if inner.failing_imports.contains(&item.name) {
            return Err(TargetError::rejected(422, format!("cannot import {}", item.name)));
        }
        if let Some(parent) = parent_page_id
            && !inner.pages.contains_key(parent)
        {
            return Err(TargetError::not_found(format!("parent page {parent}")));
        }

        let id = next_page_id(&mut inner);
        let title = title_from_name(&item.name);
        inner.pages.insert(
            id.clone(),
            StoredPage {
                id: id.clone(),
                title: title.clone(),
                space_id: space_id.to_string(),
                parent_page_id: parent_page_id.map(str::to_string),
                updated_at: Utc::now(),
            },
        );

        Ok(PageRef {
            id,
            title: Some(title),
            space_id: space_id.to_string(),
        })
    }

    async fn delete_page(&self, page_id: &str) -> Result<(), TargetError> {
        self.lock().calls.push(PageCall::Delete {
            page_id: page_id.to_string(),
        });
        self.pause().await;

        let mut inner = self.lock();
        if inner.failing_deletes.contains(page_id) {
            return Err(TargetError::unavailable(format!("cannot delete {page_id}")));
        }
        match inner.pages.remove(page_id) {
            Some(_) => Ok(()),
            None => Err(TargetError::not_found(format!("page {page_id}"))),
        }
    }

    async fn list_recent_changes(&self, space_id: &str) -> Result<Vec<RecentChange>, TargetError> {
        self.lock().calls.push(PageCall::List {
            space_id: space_id.to_string(),
        });
        self.pause().await;

        let inner = self.lock();
        if let Some(err) = &inner.listing_error {
            return Err(err.clone());
        }
        let mut changes: Vec<RecentChange> = inner
            .pages
            .values()
            .filter(|p| p.space_id == space_id)
            .map(|p| RecentChange {
                id: p.id.clone(),
                title: Some(p.title.clone()),
                updated_at: p.updated_at,
            })
            .collect();
        changes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(changes)
    }
}
