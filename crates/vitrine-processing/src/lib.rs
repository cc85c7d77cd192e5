//! Vitrine Image Processing Library
//!
//! This crate turns user-selected image files into compressed, profile-conformant
//! outputs: validation, decoding, cropping, resizing, encoding and the object URL
//! lifecycle around them.

pub mod metadata;
pub mod pipeline;

pub mod compression;
pub mod cropper;
pub mod image;
pub mod pending;
pub mod resource;
pub mod validator;

// Re-export commonly used types
pub use crate::image::{
    DecodedImage, ImageOrientation, ImageProcessor, ImageResize, ImageTransformer,
};
pub use compression::{
    CompressionResult, Compressor, FormatSelector, ImageCompressor, QualitySelector,
};
pub use cropper::{
    CenteredCrop, CropDecision, CropPrompt, CropRequest, Cropper, DeclineCrop, FixedCrop,
};
pub use metadata::ImageMetadata;
pub use pending::PendingImage;
pub use pipeline::{
    BatchReport, FileOutcome, Finalized, ProcessedImage, TeardownHandle, UploadPipeline, UploadSink,
};
pub use resource::{ObjectBlob, ResourceTracker};
pub use validator::{UploadValidator, ValidationReport};
