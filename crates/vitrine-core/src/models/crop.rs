use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::profile::AspectRatio;
use crate::error::UploadError;

/// A user-chosen region of the source image, in source-pixel coordinates.
///
/// Coordinates refer to the image after EXIF orientation has been applied,
/// which is what the user saw when drawing the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSettings {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Zoom level of the crop UI when the region was confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    /// Clockwise rotation applied to the cropped region, in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
}

impl CropSettings {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            scale: None,
            rotate: None,
        }
    }

    pub fn with_rotate(mut self, degrees: i32) -> Self {
        self.rotate = Some(degrees);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Largest rectangle of the given aspect ratio centered in a `width` x `height` image.
    pub fn centered(width: u32, height: u32, aspect: AspectRatio) -> Self {
        let target = aspect.ratio();
        let source = width as f64 / height.max(1) as f64;

        let (crop_w, crop_h) = if source > target {
            let w = (height as f64 * target).round() as u32;
            (w.clamp(1, width.max(1)), height)
        } else {
            let h = (width as f64 / target).round() as u32;
            (width, h.clamp(1, height.max(1)))
        };

        Self::new(
            (width - crop_w.min(width)) / 2,
            (height - crop_h.min(height)) / 2,
            crop_w,
            crop_h,
        )
    }

    /// Rotation normalized to 0, 90, 180 or 270.
    pub fn quarter_turns(&self) -> Result<u16, UploadError> {
        let degrees = self.rotate.unwrap_or(0);
        if degrees % 90 != 0 {
            return Err(UploadError::InvalidCrop(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }
        Ok(degrees.rem_euclid(360) as u16)
    }

    /// Check the parts of the settings that do not depend on the image.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.width == 0 || self.height == 0 {
            return Err(UploadError::InvalidCrop(format!(
                "Crop region must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(scale) = self.scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(UploadError::InvalidCrop(format!(
                    "Scale must be positive, got {}",
                    scale
                )));
            }
        }
        self.quarter_turns()?;
        Ok(())
    }

    /// Clip the region to a `width` x `height` image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Result<CropSettings, UploadError> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);

        if right <= x || bottom <= y {
            return Err(UploadError::InvalidCrop(format!(
                "Crop region {}x{}+{}+{} lies outside the {}x{} image",
                self.width, self.height, self.x, self.y, width, height
            )));
        }

        Ok(CropSettings {
            x,
            y,
            width: right - x,
            height: bottom - y,
            ..*self
        })
    }
}

impl FromStr for CropSettings {
    type Err = String;

    /// Parse "x,y,width,height"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 4 {
            return Err("Invalid crop format. Expected: x,y,width,height".to_string());
        }

        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse::<u32>()
                .map_err(|_| format!("Invalid crop value: {}", part))?;
        }

        let settings = CropSettings::new(values[0], values[1], values[2], values[3]);
        settings.validate().map_err(|e| e.to_string())?;
        Ok(settings)
    }
}
