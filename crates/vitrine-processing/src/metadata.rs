//! Image metadata read during decoding

use serde::{Deserialize, Serialize};

/// Image metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Width after EXIF orientation has been applied
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
    /// Raw EXIF orientation tag, when present and not `1`
    pub exif_orientation: Option<u8>,
    pub has_alpha: bool,
}

impl ImageMetadata {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
