//! Search providers for the harvester
//!
//! Each provider turns a text query into an ordered list of candidate image
//! URLs. Providers never raise to the caller: any internal failure (network
//! error, parse error, unexpected response shape) is logged and collapsed
//! into an empty result so the engine can fall through to the next source.

pub mod bing;
pub mod duckduckgo;
pub mod pinterest;

pub use bing::BingScrapeProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use pinterest::PinterestViaBingProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Error types for provider queries
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A search backend that produces candidate image URLs for a query
///
/// Returned URLs are roughly most-relevant first when the backend provides
/// an order; callers must not depend on exact order for correctness.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short tag used in persisted filenames
    fn tag(&self) -> &'static str;

    /// Produce candidate URLs for a query, up to roughly `limit` accepted
    /// downloads' worth of material. Must not fail: errors become an empty
    /// list.
    async fn search(&self, query: &str, limit: usize) -> Vec<String>;
}
