//! Docmost REST client.
//!
//! Docmost wraps every response in a `{"data": ...}` envelope and exposes
//! page operations as `POST /api/pages/*` endpoints.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{PageRef, PageService, RecentChange, TargetError};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport};
use crate::source::ContentItem;

/// Page size for the recent-changes listing.
const RECENT_PAGE_SIZE: u32 = 100;

/// Upper bound on listing pages, in case a server never clears `hasNextPage`.
const MAX_RECENT_PAGES: u32 = 1_000;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedPage {
    id: String,
    #[serde(default)]
    title: Option<String>,
    space_id: String,
}

#[derive(Debug, Deserialize)]
struct RecentPage {
    items: Vec<RecentChange>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    #[serde(default)]
    has_next_page: bool,
}

/// A [`PageService`] talking to a Docmost server.
#[derive(Clone)]
pub struct DocmostClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: String,
}

impl DocmostClient {
    /// Create a client for `base_url` (e.g. `https://wiki.example.com`).
    pub fn new(base_url: &str, token: &str, timeout: StdDuration) -> Result<Self, TargetError> {
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| TargetError::unavailable(e.to_string()))?;
        Self::new_with_transport(base_url, token, Arc::new(transport))
    }

    pub fn new_with_transport(
        base_url: &str,
        token: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, TargetError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| TargetError::protocol(format!("invalid Docmost URL '{base_url}': {e}")))?;
        Ok(Self {
            transport,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Accept", "application/json")
            .header("User-Agent", "pagesync")
            .header("Authorization", format!("Bearer {}", self.token))
    }

    async fn send(&self, request: HttpRequest, resource: &str) -> Result<Vec<u8>, TargetError> {
        tracing::debug!(url = %request.url, "Docmost request");
        let response = self.transport.send(self.authorize(request)).await?;
        if !response.is_success() {
            return Err(TargetError::from_status(
                response.status,
                resource,
                &response.body_text(),
            ));
        }
        Ok(response.body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
        resource: &str,
    ) -> Result<T, TargetError> {
        let request = HttpRequest::post(self.endpoint(path), body.to_string().into_bytes())
            .header("Content-Type", "application/json");
        let bytes = self.send(request, resource).await?;
        decode_envelope(&bytes)
    }
}

fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TargetError> {
    serde_json::from_slice::<Envelope<T>>(bytes)
        .map(|e| e.data)
        .map_err(|e| TargetError::protocol(e.to_string()))
}

/// Build a `multipart/form-data` body, returning the content type and bytes.
fn multipart_body(fields: &[(&str, &str)], item: &ContentItem) -> (String, Vec<u8>) {
    let boundary = format!("pagesync-{}", Uuid::new_v4().simple());
    let mut body = Vec::with_capacity(item.bytes.len() + 512);

    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    let filename = header_safe(&item.name);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", item.mime_type).as_bytes());
    body.extend_from_slice(&item.bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

/// Drop the characters that would end a quoted header parameter or the header line.
fn header_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect()
}

#[async_trait]
impl PageService for DocmostClient {
    async fn import_content(
        &self,
        item: &ContentItem,
        space_id: &str,
        parent_page_id: Option<&str>,
    ) -> Result<PageRef, TargetError> {
        let mut fields = vec![("spaceId", space_id)];
        if let Some(parent) = parent_page_id {
            fields.push(("parentPageId", parent));
        }
        let (content_type, body) = multipart_body(&fields, item);

        let request = HttpRequest::post(self.endpoint("/pages/import"), body)
            .header("Content-Type", content_type);
        let bytes = self.send(request, &format!("space {space_id}")).await?;
        let page: ImportedPage = decode_envelope(&bytes)?;

        Ok(PageRef {
            id: page.id,
            title: page.title,
            space_id: page.space_id,
        })
    }

    async fn delete_page(&self, page_id: &str) -> Result<(), TargetError> {
        let request = HttpRequest::post(
            self.endpoint("/pages/delete"),
            serde_json::json!({ "pageId": page_id }).to_string().into_bytes(),
        )
        .header("Content-Type", "application/json");
        self.send(request, &format!("page {page_id}")).await?;
        Ok(())
    }

    async fn list_recent_changes(&self, space_id: &str) -> Result<Vec<RecentChange>, TargetError> {
        let resource = format!("space {space_id}");
        let mut changes = Vec::new();

        for page in 1..=MAX_RECENT_PAGES {
            let listing: RecentPage = self
                .post_json(
                    "/pages/recent",
                    serde_json::json!({
                        "spaceId": space_id,
                        "page": page,
                        "limit": RECENT_PAGE_SIZE,
                    }),
                    &resource,
                )
                .await?;

            let done = !listing.meta.has_next_page || listing.items.is_empty();
            changes.extend(listing.items);
            if done {
                return Ok(changes);
            }
        }

        tracing::warn!(space_id, "Recent changes listing truncated at {MAX_RECENT_PAGES} pages");
        Ok(changes)
    }
}
