//! Markup-scraped Bing image search
//!
//! Issues one GET against the Bing image grid endpoint and pattern-matches
//! the embedded `murl` (media URL) markers out of the returned markup. The
//! marker being absent is a valid zero-result response, not a failure.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use reqwest::header;
use tracing::{info, warn};

use super::{ProviderResult, SearchProvider};
use crate::fetcher::random_user_agent;

const SEARCH_ENDPOINT: &str = "https://www.bing.com/images/async";

lazy_static! {
    /// Full-size media URL marker embedded in the grid markup
    static ref MEDIA_URL_PATTERN: Regex =
        Regex::new(r"murl&quot;:&quot;(.*?)&quot;").unwrap();
}

/// Bing-backed search provider
pub struct BingScrapeProvider {
    client: Client,
}

impl BingScrapeProvider {
    /// Create a new provider over the shared client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn search_inner(&self, query: &str, limit: usize) -> ProviderResult<Vec<String>> {
        // Ask for twice the limit to absorb later rejection
        let count = (limit * 2).to_string();

        let body = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", query),
                ("first", "0"),
                ("count", count.as_str()),
                ("scenario", "ImageBasicHover"),
                ("datsrc", "N_I"),
                ("layout", "ColumnBased"),
                ("mmasync", "1"),
            ])
            .header(header::USER_AGENT, random_user_agent())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(extract_media_urls(&body))
    }
}

/// Extract every media URL marker from the grid markup
fn extract_media_urls(body: &str) -> Vec<String> {
    MEDIA_URL_PATTERN
        .captures_iter(body)
        .map(|captures| captures[1].to_string())
        .collect()
}

#[async_trait]
impl SearchProvider for BingScrapeProvider {
    fn tag(&self) -> &'static str {
        "bing"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<String> {
        info!("[Bing] Searching for: {}", query);

        match self.search_inner(query, limit).await {
            Ok(urls) => {
                info!("[Bing] Found {} URLs", urls.len());
                urls
            }
            Err(e) => {
                warn!("[Bing] Search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_media_urls_from_markup() {
        let body = concat!(
            r#"<div m="{&quot;murl&quot;:&quot;https://example.com/a.jpg&quot;,"#,
            r#"&quot;turl&quot;:&quot;https://example.com/a_thumb.jpg&quot;}">"#,
            r#"<div m="{&quot;murl&quot;:&quot;https://example.com/b.png&quot;}">"#,
        );

        let urls = extract_media_urls(body);
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.jpg".to_string(),
                "https://example.com/b.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_media_urls_tolerates_marker_absence() {
        assert!(extract_media_urls("<html><body>no results</body></html>").is_empty());
    }
}
