//! Fetcher Module
//!
//! Produces quotes by scraping the swap page. `QuoteFetcher` is the seam the
//! request handler depends on; `BrowserFetcher` is the headless Chrome
//! implementation.

mod browser;
pub mod normalize;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{Quote, QuoteRequest};

pub use browser::{BrowserFetcher, BrowserSettings};
pub use normalize::{build_quote, decimals_for, floor_to, OutputProbe, OUTPUT_PROBES};

// == Quote Fetcher ==
/// Source of fresh quotes.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetches a quote for `request` from the page at `target_url`.
    async fn fetch(&self, request: &QuoteRequest, target_url: &str) -> Result<Quote, FetchError>;
}
