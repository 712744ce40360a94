//! Image fetching for the harvester
//!
//! This module provides a thin fetcher over the shared HTTP client that:
//! 1. Retrieves raw image bytes with the client's bounded timeout
//! 2. Rotates the request User-Agent through a small fixed pool
//! 3. Swallows transport failures and non-success statuses into "no content"

use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header;
use tracing::debug;

/// Browser identities rotated across requests to avoid trivial blocking
/// by upstream anti-scraping heuristics. Courtesy measure, not security.
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Pick a random identity from the pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Fetcher for candidate image URLs
#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Create a new fetcher over the shared client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch raw bytes from a URL
    ///
    /// Every failure mode (transport error, timeout, non-success status,
    /// unreadable body) is contained here and reported as `None`; the
    /// caller just moves on to the next candidate.
    pub async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, random_user_agent());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Fetch returned HTTP {} for {}", response.status(), url);
            return None;
        }

        match response.bytes().await {
            Ok(body) => Some(body.to_vec()),
            Err(e) => {
                debug!("Failed to read body for {}: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_comes_from_pool() {
        for _ in 0..20 {
            let agent = random_user_agent();
            assert!(USER_AGENTS.contains(&agent));
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_url_returns_none() {
        let fetcher = ImageFetcher::new(Client::new());
        assert!(fetcher.fetch("not a url").await.is_none());
    }
}
