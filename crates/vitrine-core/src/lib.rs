//! Vitrine Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the image upload pipeline and its command-line front end.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{CropCancelPolicy, PipelineConfig, QualityPolicy};
pub use error::{ErrorMetadata, LogLevel, ProfileError, UploadError, ValidationFailure};
pub use models::{
    AspectRatio, CompressionStats, CropSettings, OutputFormat, ProfileId, ProfileRegistry,
    ProfileSpec, SourceFile, UploadProfile,
};
