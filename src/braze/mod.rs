//! Braze content fetcher.
//!
//! Lists every email template and content block, then reads each item's
//! info endpoint for its translatable text. Kinds are fetched in
//! [`ContentKind::ALL`] order and items keep the order Braze lists them in.

mod schema;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};

pub use schema::{KindSchema, CONTENT_BLOCK, EMAIL_TEMPLATE};

use crate::config::{BrazeConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::http::client::sleep_if_needed;
use crate::http::{ApiClient, Paginator, Transport};
use crate::model::{ContentKind, KindFailure, SkippedItem, SourceItem};
use crate::sync::CancelToken;

/// Everything one fetch produced.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Items in fetch order.
    pub items: Vec<SourceItem>,
    pub skipped: Vec<SkippedItem>,
    /// Kinds abandoned after retries ran out. Items of that kind fetched
    /// before the failure are still in `items`.
    pub kind_failures: Vec<KindFailure>,
}

/// An [`ApiClient`] carrying the Braze API key.
pub fn braze_client<T: Transport>(
    transport: Arc<T>,
    config: &BrazeConfig,
    http: &HttpConfig,
) -> ApiClient<T> {
    ApiClient::new(transport, "Braze", &config.base_url, http.retry.clone())
        .with_bearer(config.api_key.expose())
}

pub struct BrazeFetcher<T: Transport> {
    client: ApiClient<T>,
    page_size: usize,
    interval: Duration,
    max_pages: usize,
}

impl<T: Transport> BrazeFetcher<T> {
    #[must_use]
    pub fn new(client: ApiClient<T>, config: &BrazeConfig, http: &HttpConfig) -> Self {
        Self {
            client,
            page_size: config.page_size.max(1),
            interval: config.request_interval,
            max_pages: http.max_pages,
        }
    }

    /// Fetch all translatable content.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if Braze rejects the key and `Error::Cancelled`
    /// if `cancel` fires. Other failures only abandon the affected kind.
    pub async fn fetch_all(&self, cancel: &CancelToken) -> Result<FetchOutcome> {
        let mut out = FetchOutcome::default();

        for kind in ContentKind::ALL {
            let schema = KindSchema::for_kind(kind);
            let before = out.items.len();

            match self.fetch_kind(schema, cancel, &mut out).await {
                Ok(()) => info!(count = out.items.len() - before, "Fetched {}", kind.label()),
                Err(err) if err.is_fatal() => {
                    error!(kind = %kind, error = %err, "Fetch aborted");
                    return Err(err);
                }
                Err(err) => {
                    warn!(kind = %kind, error = %err, "Giving up on {}", kind.label());
                    out.kind_failures.push(KindFailure {
                        kind,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(out)
    }

    async fn fetch_kind(
        &self,
        schema: &'static KindSchema,
        cancel: &CancelToken,
        out: &mut FetchOutcome,
    ) -> Result<()> {
        let page_size = self.page_size;
        let mut pages = Paginator::new(
            &self.client,
            move |offset: Option<&str>| {
                self.client
                    .request(Method::GET, schema.list_path)
                    .query("limit", page_size.to_string())
                    .query("offset", offset.unwrap_or("0"))
            },
            move |offset, page| {
                let got = schema.entries(page).len();
                if got < page_size {
                    return None;
                }
                let current: usize = offset.and_then(|o| o.parse().ok()).unwrap_or(0);
                Some((current + got).to_string())
            },
        )
        .with_max_pages(self.max_pages);

        loop {
            cancel.check()?;
            self.pace().await;
            let Some(page) = pages.next_page().await? else {
                break;
            };

            for entry in schema.entries(&page) {
                let Some(id) = schema.id_of(entry) else {
                    warn!(kind = %schema.kind, "Skipping entry without {}", schema.id_key);
                    out.skipped.push(SkippedItem {
                        kind: schema.kind,
                        source_id: None,
                        reason: format!("missing {}", schema.id_key),
                    });
                    continue;
                };

                cancel.check()?;
                self.pace().await;
                match self.fetch_item(schema, &id, entry).await {
                    Ok(item) => out.items.push(item),
                    Err(err @ (Error::Client { .. } | Error::Json(_) | Error::Validation(_))) => {
                        warn!(kind = %schema.kind, id = %id, error = %err, "Skipping item");
                        out.skipped.push(SkippedItem {
                            kind: schema.kind,
                            source_id: Some(id),
                            reason: err.to_string(),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(())
    }

    async fn fetch_item(&self, schema: &KindSchema, id: &str, entry: &Value) -> Result<SourceItem> {
        let request = self
            .client
            .request(Method::GET, schema.info_path)
            .query(schema.id_key, id);
        let info = self.client.send_json(request).await?;

        let name = schema
            .name_of(entry)
            .filter(|n| !n.is_empty())
            .or_else(|| schema.name_of(&info))
            .unwrap_or_default();
        let fields = schema.fields_of(&info);
        debug!(kind = %schema.kind, id, fields = fields.len(), "Fetched item");

        SourceItem::new(schema.kind, id, name, fields)
    }

    async fn pace(&self) {
        sleep_if_needed(self.interval).await;
    }
}
