//! Lazy, restartable pagination over list endpoints.
//!
//! A [`Paginator`] knows how to build the request for a page token and how to
//! pull the next token out of a page. Pages are fetched one at a time, on
//! demand, so a large catalog is never fully buffered here.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

use super::client::ApiClient;
use super::transport::{ApiRequest, Transport};

/// Default safety cap on pages per sequence.
pub const DEFAULT_MAX_PAGES: usize = 1000;

type BuildRequest<'a> = Box<dyn Fn(Option<&str>) -> ApiRequest + Send + Sync + 'a>;
type ExtractToken<'a> = Box<dyn Fn(Option<&str>, &Value) -> Option<String> + Send + Sync + 'a>;

/// Page sequence over one list endpoint.
pub struct Paginator<'a, T: Transport> {
    client: &'a ApiClient<T>,
    build: BuildRequest<'a>,
    extract: ExtractToken<'a>,
    max_pages: usize,
    token: Option<String>,
    pages: usize,
    done: bool,
    capped: bool,
}

impl<'a, T: Transport> Paginator<'a, T> {
    /// Create a paginator.
    ///
    /// `build` turns the current token (`None` for the first page) into a
    /// request. `extract` receives the token that produced a page plus the
    /// page itself and returns the next token, or `None` at the end.
    pub fn new<B, E>(client: &'a ApiClient<T>, build: B, extract: E) -> Self
    where
        B: Fn(Option<&str>) -> ApiRequest + Send + Sync + 'a,
        E: Fn(Option<&str>, &Value) -> Option<String> + Send + Sync + 'a,
    {
        Self {
            client,
            build: Box::new(build),
            extract: Box::new(extract),
            max_pages: DEFAULT_MAX_PAGES,
            token: None,
            pages: 0,
            done: false,
            capped: false,
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch the next page, or `Ok(None)` once the sequence is exhausted.
    ///
    /// A failed fetch leaves the position unchanged, so calling again retries
    /// the same page.
    ///
    /// # Errors
    ///
    /// Propagates the client's error classification.
    pub async fn next_page(&mut self) -> Result<Option<Value>> {
        if self.done {
            return Ok(None);
        }
        if self.pages >= self.max_pages {
            warn!(
                service = self.client.service(),
                max_pages = self.max_pages,
                "Page limit reached, stopping pagination"
            );
            self.capped = true;
            self.done = true;
            return Ok(None);
        }

        let request = (self.build)(self.token.as_deref());
        let page = self.client.send_json(request).await?;
        self.pages += 1;

        let next = (self.extract)(self.token.as_deref(), &page);
        match next {
            Some(next) if self.token.as_deref() == Some(next.as_str()) => {
                warn!(
                    service = self.client.service(),
                    token = %next,
                    "Server repeated the page token, stopping pagination"
                );
                self.done = true;
            }
            Some(next) => {
                debug!(service = self.client.service(), token = %next, "Next page token");
                self.token = Some(next);
            }
            None => self.done = true,
        }

        Ok(Some(page))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.token = None;
        self.pages = 0;
        self.done = false;
        self.capped = false;
    }

    /// Pages fetched since the last (re)start.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Whether the sequence was cut short by the page cap.
    #[must_use]
    pub fn hit_page_limit(&self) -> bool {
        self.capped
    }
}
