//! Text extraction from submitted photos.
//!
//! The pipeline only needs "bytes in, text out"; everything about the
//! vision service lives behind [`TextExtractor`] so the parsing core runs
//! in tests without a network.

pub mod vision;

pub use vision::VisionClient;

use anyhow::Result;

/// An opaque image-to-text capability.
///
/// Implementations may return an empty string or unrelated text; any string
/// is valid input to segmentation.
pub trait TextExtractor {
    fn text_from_image(&self, image: &[u8]) -> Result<String>;
}
