pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Source of raw feed documents.
#[async_trait]
pub trait Fetcher {
    /// Fetch the body behind `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
