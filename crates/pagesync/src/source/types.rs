use std::fmt;

use async_trait::async_trait;

use super::errors::ItemFetchError;

/// One fetched document, alive only for the duration of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// File name, e.g. `guide.md`.
    pub name: String,
    /// Decoded content.
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ContentItem {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Debug for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentItem")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Pull-based cursor behind a [`ContentStream`].
///
/// Implementations retrieve each item when it is pulled, in listing order.
#[async_trait]
pub trait ContentCursor: Send {
    /// Produce the next item, `None` once the listing is exhausted.
    async fn next_item(&mut self) -> Option<Result<ContentItem, ItemFetchError>>;

    /// Names of the items not pulled yet, in order.
    fn pending_names(&self) -> Vec<String>;

    /// Name of the item the next pull produces.
    fn peek_name(&self) -> Option<&str>;

    /// Number of items not pulled yet.
    fn remaining(&self) -> usize;
}

/// A lazy, finite, non-restartable sequence of content items.
pub struct ContentStream {
    cursor: Box<dyn ContentCursor>,
}

impl ContentStream {
    pub fn new(cursor: impl ContentCursor + 'static) -> Self {
        Self {
            cursor: Box::new(cursor),
        }
    }

    /// A stream over items that are already in memory.
    pub fn from_items(items: Vec<Result<ContentItem, ItemFetchError>>) -> Self {
        Self::new(VecCursor {
            items: items.into_iter().collect(),
        })
    }

    pub async fn next(&mut self) -> Option<Result<ContentItem, ItemFetchError>> {
        self.cursor.next_item().await
    }

    /// Name of the item the next pull will produce.
    #[must_use]
    pub fn next_name(&self) -> Option<String> {
        self.cursor.peek_name().map(str::to_string)
    }

    #[must_use]
    pub fn pending_names(&self) -> Vec<String> {
        self.cursor.pending_names()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("pending", &self.cursor.pending_names())
            .finish()
    }
}

struct VecCursor {
    items: std::collections::VecDeque<Result<ContentItem, ItemFetchError>>,
}

#[async_trait]
impl ContentCursor for VecCursor {
    async fn next_item(&mut self) -> Option<Result<ContentItem, ItemFetchError>> {
        self.items.pop_front()
    }

    fn pending_names(&self) -> Vec<String> {
        self.items.iter().map(|item| item_name(item).to_string()).collect()
    }

    fn peek_name(&self) -> Option<&str> {
        self.items.front().map(item_name)
    }

    fn remaining(&self) -> usize {
        self.items.len()
    }
}

fn item_name(item: &Result<ContentItem, ItemFetchError>) -> &str {
    match item {
        Ok(item) => &item.name,
        Err(e) => &e.name,
    }
}
