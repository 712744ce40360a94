//! Image validation for the harvester
//!
//! Pure accept/reject policy over raw candidate bytes:
//! 1. Byte-length bounds (catches thumbnails, placeholders and junk payloads)
//! 2. Decodability (header probe only, no full decode)
//! 3. Orientation (landscape only)
//! 4. Minimum pixel dimensions

use std::io::Cursor;

use image::ImageReader;

use crate::config_loader::Limits;

/// Outcome of validating one candidate's bytes
///
/// The rejection reason is human-diagnostic only; nothing downstream
/// branches on its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(String),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

/// Validator for candidate image content
#[derive(Debug, Clone)]
pub struct ImageValidator {
    limits: Limits,
}

impl ImageValidator {
    /// Create a validator from the configured limits
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Judge raw bytes against the acceptance policy
    ///
    /// Checks short-circuit in order of cost: length comparisons run before
    /// the dimension probe, and the orientation comparison runs before the
    /// absolute resolution one.
    pub fn validate(&self, content: &[u8]) -> ValidationOutcome {
        if content.len() < self.limits.min_file_size {
            return ValidationOutcome::Rejected(format!(
                "File too small: {:.1}KB",
                content.len() as f64 / 1024.0
            ));
        }

        if content.len() > self.limits.max_file_size {
            return ValidationOutcome::Rejected("File too large".to_string());
        }

        let (width, height) = match probe_dimensions(content) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                return ValidationOutcome::Rejected(format!("Invalid image data: {}", e));
            }
        };

        if height > width {
            return ValidationOutcome::Rejected(
                "Portrait orientation (prefer landscape)".to_string(),
            );
        }

        if width < self.limits.min_width || height < self.limits.min_height {
            return ValidationOutcome::Rejected(format!(
                "Resolution too low: {}x{}",
                width, height
            ));
        }

        ValidationOutcome::Accepted
    }
}

/// Read the image dimensions from the header without decoding pixel data
fn probe_dimensions(content: &[u8]) -> Result<(u32, u32), image::ImageError> {
    ImageReader::new(Cursor::new(content))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}
