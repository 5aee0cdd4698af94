//! HTTP client adapter shared by the Braze and Transifex clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────────┐
//! │  Braze fetcher   │   │ Transifex manager  │
//! └────────┬─────────┘   └─────────┬──────────┘
//!          │      Paginator        │
//!          ▼                       ▼
//! ┌─────────────────────────────────────────────┐
//! │ ApiClient (auth headers, retry, 401/403/4xx │
//! │ classification, Retry-After)                │
//! └──────────────────────┬──────────────────────┘
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │ Transport (ReqwestTransport: one pooled     │
//! │ reqwest::Client per run)                    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod pagination;
pub mod retry;
pub mod transport;

pub use client::{parse_json, ApiClient};
pub use pagination::{Paginator, DEFAULT_MAX_PAGES};
pub use retry::{is_transient_status, parse_retry_after, RetryPolicy};
pub use transport::{
    ApiRequest, RawResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind,
};
