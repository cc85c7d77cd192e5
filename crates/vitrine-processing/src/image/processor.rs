//! Image processor - decoding, metadata extraction and EXIF orientation

use crate::image::orientation::ImageOrientation;
use crate::metadata::ImageMetadata;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use vitrine_core::UploadError;

/// A decoded image together with what was learned while decoding it
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub metadata: ImageMetadata,
}

pub struct ImageProcessor;

impl ImageProcessor {
    /// Read format and dimensions from the image header without decoding pixels.
    ///
    /// Dimensions are the stored ones, before EXIF orientation.
    pub fn probe(data: &[u8]) -> Result<(String, u32, u32), UploadError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        let format = reader
            .format()
            .map(|f| format!("{:?}", f))
            .ok_or_else(|| UploadError::Decode("Unrecognised image format".to_string()))?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        Ok((format, width, height))
    }

    /// Decode an image, refusing anything above `max_pixels` before the full decode.
    pub fn decode(
        data: &[u8],
        max_pixels: u64,
        auto_orient: bool,
    ) -> Result<DecodedImage, UploadError> {
        let (format, width, height) = Self::probe(data)?;

        let pixels = width as u64 * height as u64;
        if pixels > max_pixels {
            tracing::warn!(
                width = width,
                height = height,
                max_pixels = max_pixels,
                "Refusing to decode oversized image"
            );
            return Err(UploadError::Decode(format!(
                "Image is {}x{} ({} pixels), above the {} pixel limit",
                width, height, pixels, max_pixels
            )));
        }

        let mut img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| UploadError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        let orientation = Self::read_exif_orientation(data);
        if auto_orient && orientation != 1 {
            img = ImageOrientation::apply_exif_orientation(img, orientation);
        }

        let (width, height) = img.dimensions();
        let metadata = ImageMetadata {
            width,
            height,
            format,
            size_bytes: data.len() as u64,
            exif_orientation: (orientation != 1).then_some(orientation),
            has_alpha: img.color().has_alpha(),
        };

        Ok(DecodedImage {
            image: img,
            metadata,
        })
    }

    /// Read EXIF orientation tag from image data.
    ///
    /// Returns orientation value (1-8) or 1 (normal) if missing or unreadable.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let mut cursor = Cursor::new(data);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .map(|value| value as u8)
            .unwrap_or(1)
    }

    /// Get rotation and flip operations needed for a given EXIF orientation
    /// Returns (rotate_angle, flip_horizontal, flip_vertical), rotation applied first
    pub fn get_orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(90), true, false),   // Transpose
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(270), true, false),  // Transverse
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),      // Invalid, treat as normal
        }
    }
}
