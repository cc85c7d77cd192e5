//! Image processing module
//!
//! - Decoding with a pixel budget and EXIF orientation (processor, orientation)
//! - Crop, rotation and shrink-to-fit ahead of encoding (transformer, resize)

pub mod orientation;
pub mod processor;
pub mod resize;
pub mod transformer;

pub use orientation::ImageOrientation;
pub use processor::{DecodedImage, ImageProcessor};
pub use resize::ImageResize;
pub use transformer::ImageTransformer;
