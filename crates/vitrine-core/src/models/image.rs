use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output format for compressed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Auto, // PNG when the image carries transparency, JPEG otherwise
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "auto" => Ok(OutputFormat::Auto),
            _ => Err(anyhow::anyhow!("Invalid format: {}", s)),
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Auto => "image/jpeg", // fallback
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg | OutputFormat::Auto => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Content types a file extension may legitimately carry.
///
/// Returns an empty slice for extensions outside the image family.
pub fn content_types_for_extension(extension: &str) -> &'static [&'static str] {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" | "jfif" => &["image/jpeg", "image/jpg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "avif" => &["image/avif"],
        "bmp" => &["image/bmp"],
        "tif" | "tiff" => &["image/tiff"],
        "svg" => &["image/svg+xml"],
        "heic" => &["image/heic"],
        "ico" => &["image/x-icon", "image/vnd.microsoft.icon"],
        _ => &[],
    }
}

/// Lowercased MIME type with parameters (`; charset=...`) stripped.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// A file selected by the user, before any processing.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension of the file name, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}
