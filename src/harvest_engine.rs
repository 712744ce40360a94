//! Harvest engine for the image-acquisition pipeline
//!
//! This module provides the controller that:
//! 1. Drives queries strictly in input order through the providers in
//!    priority order (ddg, then bing, then pinterest-via-bing)
//! 2. Fetches each source's candidates concurrently but judges them in
//!    candidate-list order
//! 3. Applies the fetch → dedupe → validate → persist pipeline with a
//!    per-(query, source) acceptance quota
//! 4. Pauses between queries for rate courtesy and regenerates the
//!    manifest after the last query

use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config_loader::{AppConfig, ConfigManager};
use crate::fetcher::ImageFetcher;
use crate::hash_store::DigestStore;
use crate::image_validator::{ImageValidator, ValidationOutcome};
use crate::manifest_writer::{ManifestError, ManifestWriter};
use crate::providers::{
    BingScrapeProvider, DuckDuckGoProvider, PinterestViaBingProvider, SearchProvider,
};

/// Error types for the harvest engine
///
/// Only environment-level failures live here: per-candidate and per-source
/// failures are contained where they happen and never reach the caller.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// Result type for harvest operations
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Persisted image extension; the pipeline stores bytes as-is, it never
/// transcodes
const IMAGE_EXT: &str = "jpg";

lazy_static! {
    /// Runs of characters collapsed to a single separator in filenames
    static ref SLUG_PATTERN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Counters for one run
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    pub candidates_seen: usize,
    pub fetch_failures: usize,
    pub duplicates_skipped: usize,
    pub rejected: usize,
    pub saved: usize,
}

/// Controller that owns the shared client, the providers, and the run state
pub struct HarvestEngine {
    config: AppConfig,
    providers: Vec<Box<dyn SearchProvider>>,
    fetcher: ImageFetcher,
    validator: ImageValidator,
    digests: DigestStore,
    stats: Mutex<HarvestStats>,
    output_dir: PathBuf,
}

impl HarvestEngine {
    /// Create a new engine from a config snapshot
    pub fn new(config: AppConfig) -> HarvestResult<Self> {
        // One shared client: the connection pool is reused across every
        // provider query and image fetch for the whole run
        let client = Client::builder()
            .timeout(Duration::from_secs(config.rate.fetch_timeout_secs))
            .pool_max_idle_per_host(config.pools.max_fetch_concurrency.max(4))
            .gzip(true)
            .tcp_nodelay(true)
            .build()?;

        // Priority order: library-backed search first, then the markup
        // scraper, then the site-restricted composite
        let providers: Vec<Box<dyn SearchProvider>> = vec![
            Box::new(DuckDuckGoProvider::new(client.clone(), config.search.clone())),
            Box::new(BingScrapeProvider::new(client.clone())),
            Box::new(PinterestViaBingProvider::new(client.clone())),
        ];

        let fetcher = ImageFetcher::new(client);
        let validator = ImageValidator::new(config.limits.clone());
        let output_dir = PathBuf::from(&config.paths.output_directory);

        Ok(Self {
            config,
            providers,
            fetcher,
            validator,
            digests: DigestStore::new(),
            stats: Mutex::new(HarvestStats::default()),
            output_dir,
        })
    }

    /// Create a new engine from the config manager
    pub fn from_config(config_manager: &ConfigManager) -> HarvestResult<Self> {
        let config = config_manager
            .get_app_config()
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        Self::new(config)
    }

    /// Process every query, then regenerate the manifest
    pub async fn run(&self, queries: &[&str]) -> HarvestResult<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        for query in queries {
            info!("Processing query: {}", query);

            for provider in &self.providers {
                let urls = provider
                    .search(query, self.config.limits.candidates_per_source)
                    .await;

                if urls.is_empty() {
                    debug!("No candidates from {} for: {}", provider.tag(), query);
                    continue;
                }

                let saved = self.harvest_batch(&urls, query, provider.tag()).await?;
                debug!(
                    "Accepted {} image(s) from {} for: {}",
                    saved,
                    provider.tag(),
                    query
                );
            }

            // Courtesy pause between queries
            sleep(Duration::from_secs(self.config.rate.query_delay_secs)).await;
        }

        // The manifest is rebuilt strictly after all queries complete
        let writer = ManifestWriter::new(&self.output_dir, self.config.paths.public_prefix.clone());
        writer.rebuild()?;

        let stats = self.stats();
        info!(
            "Run complete: {} saved, {} duplicates, {} rejected, {} fetch failures, {} candidates seen",
            stats.saved,
            stats.duplicates_skipped,
            stats.rejected,
            stats.fetch_failures,
            stats.candidates_seen
        );

        Ok(())
    }

    /// Fetch one source's candidates concurrently and drain them in order
    async fn harvest_batch(
        &self,
        urls: &[String],
        query: &str,
        source_tag: &str,
    ) -> HarvestResult<usize> {
        let fetcher = &self.fetcher;

        // buffered() hides network latency while still yielding results in
        // candidate-list order, so concurrency cannot change which
        // candidates are accepted
        let results = stream::iter(urls.to_vec())
            .map(|url| async move {
                let content = fetcher.fetch(&url).await;
                (url, content)
            })
            .buffered(self.config.pools.max_fetch_concurrency.max(1));

        self.drain_candidates(results, query, source_tag).await
    }

    /// Run fetched candidates through dedupe → validate → persist until the
    /// per-(query, source) quota is reached
    ///
    /// Dropping the stream at the cap stops pulling further candidates and
    /// cancels in-flight fetches. Every per-candidate failure is
    /// skip-and-continue; only persistence errors propagate.
    async fn drain_candidates<S>(
        &self,
        mut results: S,
        query: &str,
        source_tag: &str,
    ) -> HarvestResult<usize>
    where
        S: Stream<Item = (String, Option<Vec<u8>>)> + Unpin,
    {
        let quota = self.config.limits.per_source_quota;
        let mut accepted = 0usize;

        while accepted < quota {
            let Some((url, content)) = results.next().await else {
                break;
            };
            self.stats.lock().candidates_seen += 1;

            let Some(content) = content else {
                self.stats.lock().fetch_failures += 1;
                continue;
            };

            // First-seen-wins across all sources and all queries;
            // duplicates earn no quota credit
            if self.digests.is_duplicate(&content) {
                self.stats.lock().duplicates_skipped += 1;
                continue;
            }

            if let ValidationOutcome::Rejected(reason) = self.validator.validate(&content) {
                debug!("Skipped {}: {}", truncate_for_log(&url), reason);
                self.stats.lock().rejected += 1;
                continue;
            }

            let filename = image_filename(query, source_tag, accepted);
            let path = self.output_dir.join(&filename);

            // Disk failure is an environment problem, not a data-quality
            // one: it aborts the run
            tokio::fs::write(&path, &content).await?;

            info!("Saved [{}] {}", source_tag, filename);
            self.stats.lock().saved += 1;
            accepted += 1;
        }

        Ok(accepted)
    }

    /// Snapshot of the run counters
    pub fn stats(&self) -> HarvestStats {
        self.stats.lock().clone()
    }
}

/// Derive the persisted filename from the query, source tag and accepted
/// index
///
/// Same-name collisions across runs silently overwrite; that is accepted
/// behavior.
fn image_filename(query: &str, source_tag: &str, index: usize) -> String {
    let lowered = query.to_lowercase();
    let slug = SLUG_PATTERN.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    format!("{}_{}_{}.{}", slug, source_tag, index, IMAGE_EXT)
}

/// Clamp a URL for diagnostic output
fn truncate_for_log(url: &str) -> &str {
    match url.char_indices().nth(40) {
        Some((idx, _)) => &url[..idx],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use image::{ImageFormat, RgbImage};

    use super::*;

    fn test_engine(output_dir: &Path) -> HarvestEngine {
        let mut config = AppConfig::default();
        config.paths.output_directory = output_dir.to_string_lossy().to_string();
        config.limits.min_file_size = 16;
        config.limits.max_file_size = 1024 * 1024;
        config.limits.min_width = 10;
        config.limits.min_height = 5;
        config.limits.per_source_quota = 3;

        HarvestEngine::new(config).unwrap()
    }

    /// Valid landscape fixture; the seed varies the pixels so each call can
    /// produce distinct content bytes
    fn png_bytes(seed: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(20, 10, |x, y| {
            image::Rgb([seed, (x % 256) as u8, (y % 256) as u8])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn candidates(contents: Vec<Option<Vec<u8>>>) -> Vec<(String, Option<Vec<u8>>)> {
        contents
            .into_iter()
            .enumerate()
            .map(|(i, content)| (format!("https://example.com/{}.jpg", i), content))
            .collect()
    }

    #[test]
    fn test_image_filename_slugifies_query() {
        assert_eq!(
            image_filename("Happy Family! @ Park (2024)", "ddg", 0),
            "happy-family-park-2024_ddg_0.jpg"
        );
        assert_eq!(image_filename("toronto skyline", "bing", 4), "toronto-skyline_bing_4.jpg");
        assert_eq!(image_filename("  lakes & trees  ", "pin", 2), "lakes-trees_pin_2.jpg");
    }

    #[tokio::test]
    async fn test_acceptance_never_exceeds_per_source_quota() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());

        // Eight valid, distinct candidates against a quota of three
        let batch = candidates((0u8..8).map(|i| Some(png_bytes(i))).collect());
        let accepted = engine
            .drain_candidates(stream::iter(batch), "mountain lake", "ddg")
            .await
            .unwrap();

        assert_eq!(accepted, 3);
        assert_eq!(engine.stats().saved, 3);

        // Earlier-listed candidates win: indexes 0..3 are the ones on disk
        for i in 0..3 {
            assert!(dir.path().join(format!("mountain-lake_ddg_{}.jpg", i)).exists());
        }
        assert!(!dir.path().join("mountain-lake_ddg_3.jpg").exists());
    }

    #[tokio::test]
    async fn test_duplicate_content_persists_once_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let repeated = png_bytes(42);

        let first = engine
            .drain_candidates(
                stream::iter(candidates(vec![Some(repeated.clone())])),
                "city park",
                "ddg",
            )
            .await
            .unwrap();
        let second = engine
            .drain_candidates(
                stream::iter(candidates(vec![Some(repeated)])),
                "city park",
                "bing",
            )
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(engine.stats().duplicates_skipped, 1);
        assert!(dir.path().join("city-park_ddg_0.jpg").exists());
        assert!(!dir.path().join("city-park_bing_0.jpg").exists());
    }

    #[tokio::test]
    async fn test_duplicates_earn_no_quota_credit() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let repeated = png_bytes(7);

        // Seed the digest store, then offer the duplicate ahead of three
        // fresh candidates with a quota of three
        engine
            .drain_candidates(
                stream::iter(candidates(vec![Some(repeated.clone())])),
                "seed",
                "ddg",
            )
            .await
            .unwrap();

        let batch = candidates(vec![
            Some(repeated),
            Some(png_bytes(8)),
            Some(png_bytes(9)),
            Some(png_bytes(10)),
        ]);
        let accepted = engine
            .drain_candidates(stream::iter(batch), "harbour", "bing")
            .await
            .unwrap();

        assert_eq!(accepted, 3);
    }

    #[tokio::test]
    async fn test_absent_and_rejected_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());

        let batch = candidates(vec![
            None,                     // fetch timed out or failed
            Some(vec![0xAB; 512]),    // undecodable payload
            Some(png_bytes(1)),
        ]);
        let accepted = engine
            .drain_candidates(stream::iter(batch), "autumn street", "pin")
            .await
            .unwrap();

        assert_eq!(accepted, 1);

        let stats = engine.stats();
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.rejected, 1);
        // The single accept still lands at index zero
        assert!(dir.path().join("autumn-street_pin_0.jpg").exists());
    }

    #[tokio::test]
    async fn test_empty_candidate_stream_accepts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());

        let accepted = engine
            .drain_candidates(stream::iter(candidates(vec![])), "no results", "ddg")
            .await
            .unwrap();

        assert_eq!(accepted, 0);
        assert_eq!(engine.stats().candidates_seen, 0);
    }
}
