//! Application-wide constants.

/// Bytes in one megabyte, as profiles express size limits in MB.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Scheme prefix of object URLs handed out by the resource tracker.
pub const OBJECT_URL_PREFIX: &str = "blob:vitrine/";

/// MIME types every profile accepts.
pub const BASE_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Default decode budget: 100 megapixels.
pub const DEFAULT_MAX_DECODE_PIXELS: u64 = 100_000_000;

pub const DEFAULT_MAX_PARALLEL_FILES: usize = 4;

/// Parallelism ceiling accepted from configuration.
pub const MAX_PARALLEL_FILES: usize = 1024;
