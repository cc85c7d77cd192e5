//! Error types module
//!
//! Every failure the upload pipeline can produce for a single file is an
//! `UploadError`. None of them are fatal: the orchestrator records the error
//! against the file and carries on with its siblings.

use serde::Serialize;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like unreadable files
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "VALIDATION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can recover by acting on the same file (e.g. confirming a crop)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A single reason the validator rejected a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported format: {content_type} (allowed: {allowed:?})")]
    UnsupportedFormat {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File extension '{extension}' does not match content type {content_type}")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },

    #[error("File content looks like {detected}, but was declared as {declared}")]
    SignatureMismatch { declared: String, detected: String },

    #[error("Profile accepts at most {max} file(s)")]
    TooManyFiles { max: usize },
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UploadError {
    #[error("Validation failed: {}", join_failures(.0))]
    Validation(Vec<ValidationFailure>),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Crop is required but was not confirmed")]
    CropIncomplete,

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Upload scope was torn down before processing finished")]
    Cancelled,

    #[error("Pending image not found: {0}")]
    NotFound(Uuid),
}

/// Errors raised while building an `UploadProfile`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Quality must be between 0 and 100, got {0}")]
    QualityOutOfRange(u8),

    #[error("Maximum dimensions must be non-zero, got {width}x{height}")]
    ZeroBounds { width: u32, height: u32 },

    #[error("Maximum size must be non-zero")]
    ZeroMaxSize,

    #[error("Maximum size of {0} MB does not fit in a byte count")]
    MaxSizeTooLarge(u64),

    #[error("At least one allowed format is required")]
    NoAllowedFormats,

    #[error("Allowed format is not an image MIME type: {0}")]
    InvalidFormat(String),

    #[error("Aspect ratio terms must be non-zero, got {width}:{height}")]
    InvalidAspectRatio { width: u32, height: u32 },

    #[error("A required crop needs an aspect ratio")]
    RequiredCropWithoutAspect,
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn upload_error_static_metadata(
    err: &UploadError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        UploadError::Validation(_) => (
            "VALIDATION_FAILED",
            false,
            Some("Choose a smaller file in a supported format"),
            LogLevel::Debug,
        ),
        UploadError::Decode(_) => (
            "DECODE_FAILED",
            false,
            Some("Check image format and try a different file"),
            LogLevel::Warn,
        ),
        UploadError::Encode(_) => (
            "ENCODE_FAILED",
            false,
            Some("Try a different output format or file"),
            LogLevel::Error,
        ),
        UploadError::CropIncomplete => (
            "CROP_INCOMPLETE",
            true,
            Some("Confirm a crop region for this image"),
            LogLevel::Debug,
        ),
        UploadError::InvalidCrop(_) => (
            "INVALID_CROP",
            true,
            Some("Select a crop region inside the image"),
            LogLevel::Debug,
        ),
        UploadError::Cancelled => ("CANCELLED", false, None, LogLevel::Debug),
        UploadError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Select the file again"),
            LogLevel::Debug,
        ),
    }
}

impl UploadError {
    /// Validation reasons, if this is a validation error.
    pub fn validation_failures(&self) -> &[ValidationFailure] {
        match self {
            UploadError::Validation(reasons) => reasons,
            _ => &[],
        }
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        upload_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Validation(reasons) => join_failures(reasons),
            UploadError::Decode(_) => "This file could not be read as an image".to_string(),
            UploadError::Encode(_) => "This image could not be compressed".to_string(),
            UploadError::CropIncomplete => "Please crop this image before continuing".to_string(),
            UploadError::InvalidCrop(ref msg) => msg.clone(),
            UploadError::Cancelled => "Upload was cancelled".to_string(),
            UploadError::NotFound(_) => "This file is no longer selected".to_string(),
        }
    }
}
