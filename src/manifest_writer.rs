//! Manifest generation for the harvester
//!
//! After a run completes, the output directory is re-scanned and the
//! manifest rebuilt from scratch: it is a snapshot of whatever image files
//! currently exist (including ones from prior runs), not an incremental
//! ledger of this run's additions.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Error types for manifest operations
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Fixed manifest location inside the output directory
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Extensions counted as persisted images
const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// One manifest entry: public-facing path plus current byte size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
}

/// Writer that regenerates the manifest from the output directory
pub struct ManifestWriter {
    output_dir: PathBuf,
    public_prefix: String,
}

impl ManifestWriter {
    /// Create a writer for an output directory and its public path prefix
    pub fn new(output_dir: impl AsRef<Path>, public_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Rebuild the manifest from the directory's current contents
    ///
    /// Fully overwrites any previous manifest. The sorted map keeps
    /// regeneration byte-identical for an unchanged directory.
    pub fn rebuild(&self) -> ManifestResult<BTreeMap<String, ManifestEntry>> {
        let mut entries = BTreeMap::new();

        for dir_entry in fs::read_dir(&self.output_dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();

            if !is_image_file(&path) {
                continue;
            }

            let Some(filename) = path.file_name().and_then(OsStr::to_str) else {
                continue;
            };

            let size = dir_entry.metadata()?.len();
            entries.insert(
                filename.to_string(),
                ManifestEntry {
                    path: format!("{}/{}", self.public_prefix.trim_end_matches('/'), filename),
                    size,
                },
            );
        }

        let payload = serde_json::to_string_pretty(&entries)?;
        fs::write(self.output_dir.join(MANIFEST_FILENAME), payload)?;

        info!("Manifest updated with {} entries", entries.len());
        Ok(entries)
    }
}

/// Whether a path names a regular file with a known image extension
fn is_image_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_indexes_only_image_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sunset_ddg_0.jpg"), vec![1u8; 64]).unwrap();
        fs::write(dir.path().join("skyline_bing_1.png"), vec![2u8; 32]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let writer = ManifestWriter::new(dir.path(), "/assets/visionary");
        let entries = writer.rebuild().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries["sunset_ddg_0.jpg"],
            ManifestEntry {
                path: "/assets/visionary/sunset_ddg_0.jpg".to_string(),
                size: 64,
            }
        );
        assert_eq!(entries["skyline_bing_1.png"].size, 32);
        assert!(!entries.contains_key("notes.txt"));
    }

    #[test]
    fn test_rebuild_excludes_the_manifest_itself() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), vec![0u8; 8]).unwrap();

        let writer = ManifestWriter::new(dir.path(), "/img");
        writer.rebuild().unwrap();
        let entries = writer.rebuild().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!entries.contains_key(MANIFEST_FILENAME));
    }

    #[test]
    fn test_rebuild_is_byte_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), vec![0u8; 16]).unwrap();
        fs::write(dir.path().join("a.jpg"), vec![0u8; 8]).unwrap();

        let writer = ManifestWriter::new(dir.path(), "/img");
        writer.rebuild().unwrap();
        let first = fs::read(dir.path().join(MANIFEST_FILENAME)).unwrap();
        writer.rebuild().unwrap();
        let second = fs::read(dir.path().join(MANIFEST_FILENAME)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rebuild_reflects_prior_run_contents() {
        let dir = tempfile::tempdir().unwrap();
        // Simulates a file left behind by an earlier run
        fs::write(dir.path().join("old_run_pin_4.jpg"), vec![0u8; 100]).unwrap();

        let writer = ManifestWriter::new(dir.path(), "/img");
        let entries = writer.rebuild().unwrap();

        assert!(entries.contains_key("old_run_pin_4.jpg"));
    }
}
