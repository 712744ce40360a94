//! Library-style DuckDuckGo image search
//!
//! Talks to the DuckDuckGo image endpoint the same way the official client
//! libraries do: fetch the search page once to obtain the `vqd` request
//! token, then call the JSON `i.js` endpoint with the configured region,
//! safe-search flag and size class.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use reqwest::header;
use serde::Deserialize;
use tracing::{info, warn};

use super::{ProviderError, ProviderResult, SearchProvider};
use crate::config_loader::Search;
use crate::fetcher::random_user_agent;

const TOKEN_ENDPOINT: &str = "https://duckduckgo.com/";
const IMAGE_ENDPOINT: &str = "https://duckduckgo.com/i.js";

lazy_static! {
    /// Request token embedded in the search page markup
    static ref VQD_PATTERN: Regex = Regex::new(r#"vqd=['"]?([\d-]+)"#).unwrap();
}

/// One page of image results from the JSON endpoint
#[derive(Debug, Deserialize)]
struct ImagePage {
    #[serde(default)]
    results: Vec<ImageHit>,
}

#[derive(Debug, Deserialize)]
struct ImageHit {
    image: Option<String>,
}

/// DuckDuckGo-backed search provider, tuned toward wallpaper-class imagery
pub struct DuckDuckGoProvider {
    client: Client,
    search: Search,
}

impl DuckDuckGoProvider {
    /// Create a new provider over the shared client
    pub fn new(client: Client, search: Search) -> Self {
        Self { client, search }
    }

    /// Fetch the search page and extract the vqd request token
    async fn request_token(&self, query: &str) -> ProviderResult<String> {
        let body = self
            .client
            .get(TOKEN_ENDPOINT)
            .query(&[("q", query)])
            .header(header::USER_AGENT, random_user_agent())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_token(&body)
            .ok_or_else(|| ProviderError::Parse("vqd token not found in search page".to_string()))
    }

    async fn search_inner(&self, query: &str, limit: usize) -> ProviderResult<Vec<String>> {
        let vqd = self.request_token(query).await?;

        // Ask for twice the limit to absorb later rejection
        let wanted = limit * 2;
        let safe_search = if self.search.safe_search { "1" } else { "-1" };
        let size_filter = format!("size:{}", self.search.size_class);

        let page: ImagePage = self
            .client
            .get(IMAGE_ENDPOINT)
            .query(&[
                ("l", self.search.region.as_str()),
                ("o", "json"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("f", size_filter.as_str()),
                ("p", safe_search),
            ])
            .header(header::USER_AGENT, random_user_agent())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let urls = page
            .results
            .into_iter()
            .filter_map(|hit| hit.image)
            .filter(|url| !url.is_empty())
            .take(wanted)
            .collect();

        Ok(urls)
    }
}

/// Pull the request token out of the search page markup
fn extract_token(body: &str) -> Option<String> {
    VQD_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn tag(&self) -> &'static str {
        "ddg"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<String> {
        info!("[DDG] Searching for: {}", query);

        match self.search_inner(query, limit).await {
            Ok(urls) => {
                info!("[DDG] Found {} URLs", urls.len());
                urls
            }
            Err(e) => {
                warn!("[DDG] Search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_from_markup() {
        let body = r#"...nrje('iur=%2Fd.js%3Fq%3Dtest',...);vqd="4-16854412345678901234567890";..."#;
        assert_eq!(
            extract_token(body),
            Some("4-16854412345678901234567890".to_string())
        );
    }

    #[test]
    fn test_extract_token_unquoted_form() {
        let body = "https://duckduckgo.com/i.js?q=test&vqd=3-99887766";
        assert_eq!(extract_token(body), Some("3-99887766".to_string()));
    }

    #[test]
    fn test_extract_token_absent() {
        assert_eq!(extract_token("<html>no token here</html>"), None);
    }
}
