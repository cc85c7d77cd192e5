//! Image transformer - chains crop, rotation and resize ahead of encoding

use crate::image::orientation::ImageOrientation;
use crate::image::resize::ImageResize;
use image::{DynamicImage, GenericImageView};
use vitrine_core::{CropSettings, UploadError};

pub struct ImageTransformer;

impl ImageTransformer {
    /// Cut the crop region out of an (already oriented) image.
    pub fn apply_crop(
        img: &DynamicImage,
        crop: &CropSettings,
    ) -> Result<DynamicImage, UploadError> {
        crop.validate()?;
        let (width, height) = img.dimensions();
        let region = crop.clamp_to(width, height)?;

        if region.width != crop.width || region.height != crop.height {
            tracing::debug!(
                requested_width = crop.width,
                requested_height = crop.height,
                width = region.width,
                height = region.height,
                "Crop region clipped to image bounds"
            );
        }

        Ok(img.crop_imm(region.x, region.y, region.width, region.height))
    }

    /// Prepare pixels for encoding:
    /// 1. Crop (if any)
    /// 2. Rotation carried by the crop
    /// 3. Shrink-only resize into the bounds
    pub fn prepare(
        img: DynamicImage,
        crop: Option<&CropSettings>,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, UploadError> {
        let mut img = img;

        if let Some(crop) = crop {
            img = Self::apply_crop(&img, crop)?;

            let turns = crop.quarter_turns()?;
            if turns != 0 {
                tracing::debug!(angle = turns, "Applying crop rotation");
                img = ImageOrientation::rotate_by_angle(img, turns);
            }
        }

        Ok(ImageResize::resize_to_fit(img, max_width, max_height))
    }
}
