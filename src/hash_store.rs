//! Content-hash deduplication for the harvester
//!
//! One digest set covers the whole run, across every query and every
//! source: an image seen twice anywhere in the run is persisted once. The
//! set only grows and is reinitialized each run.

use std::collections::HashSet;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Run-wide store of content digests already seen
///
/// Exact-byte matching only: a re-encoded or resized copy of the same image
/// is not detected as a duplicate.
pub struct DigestStore {
    seen: Mutex<HashSet<[u8; 32]>>,
}

impl DigestStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Check content against the store, registering it on first sight
    ///
    /// Returns true when the exact byte sequence has been seen before.
    /// Mutation is serialized behind the lock so concurrent fetch workers
    /// cannot both claim first sight of the same content.
    pub fn is_duplicate(&self, content: &[u8]) -> bool {
        let digest: [u8; 32] = Sha256::digest(content).into();

        let mut seen = self.seen.lock();
        if seen.contains(&digest) {
            debug!("Duplicate content: {}", hex::encode(&digest[..8]));
            return true;
        }

        seen.insert(digest);
        false
    }

    /// Number of distinct digests registered this run
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl Default for DigestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes_flag_as_duplicate_on_second_sight() {
        let store = DigestStore::new();
        let content = b"the very same image bytes";

        assert!(!store.is_duplicate(content));
        assert!(store.is_duplicate(content));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_bytes_are_independent() {
        let store = DigestStore::new();

        assert!(!store.is_duplicate(b"first image"));
        assert!(!store.is_duplicate(b"second image"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_starts_empty() {
        let store = DigestStore::new();
        assert!(store.is_empty());
    }
}
