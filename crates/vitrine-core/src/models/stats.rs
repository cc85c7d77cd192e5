use serde::{Deserialize, Serialize};

/// Size statistics of one compression run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
    /// `(original - compressed) / original`; negative when the output grew
    pub compression_ratio: f64,
}

impl CompressionStats {
    pub fn new(original_size: u64, compressed_size: u64) -> Self {
        let compression_ratio = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - compressed_size as f64) / original_size as f64
        };

        Self {
            original_size,
            compressed_size,
            compression_ratio,
        }
    }

    /// Bytes saved, zero when the output grew
    pub fn saved_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }
}
