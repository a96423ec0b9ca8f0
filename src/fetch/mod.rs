//! Source image retrieval.
//!
//! [`ImageFetcher`] is the seam between the split flow and the network. The
//! production implementation is [`HttpFetcher`]; tests substitute an
//! in-memory fetcher.

mod client;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use client::{HttpFetcher, DEFAULT_FETCH_TIMEOUT_SECS};

/// Retrieves the full body of a source image.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url` and return its body as opaque bytes.
    ///
    /// Implementations make a single attempt; there are no retries.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}
