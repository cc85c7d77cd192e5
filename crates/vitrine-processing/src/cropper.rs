//! Interactive crop step
//!
//! The pipeline does not draw a crop UI. It asks a [`CropPrompt`] for a
//! decision and applies the profile's rules to the answer.

use async_trait::async_trait;
use serde::Serialize;
use vitrine_core::{AspectRatio, CropCancelPolicy, CropSettings, UploadError, UploadProfile};

/// What the prompt is told about the image it should crop
#[derive(Debug, Clone, Serialize)]
pub struct CropRequest {
    pub file_name: String,
    /// Dimensions after EXIF orientation
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: Option<AspectRatio>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CropDecision {
    Confirmed(CropSettings),
    Cancelled,
}

/// Source of user crop decisions
#[async_trait]
pub trait CropPrompt: Send + Sync {
    async fn request_crop(&self, request: &CropRequest) -> CropDecision;
}

/// Always confirms the same rectangle
#[derive(Debug, Clone)]
pub struct FixedCrop(pub CropSettings);

#[async_trait]
impl CropPrompt for FixedCrop {
    async fn request_crop(&self, _request: &CropRequest) -> CropDecision {
        CropDecision::Confirmed(self.0)
    }
}

/// Confirms the largest centered rectangle of the profile's aspect ratio
#[derive(Debug, Clone, Default)]
pub struct CenteredCrop;

#[async_trait]
impl CropPrompt for CenteredCrop {
    async fn request_crop(&self, request: &CropRequest) -> CropDecision {
        let settings = match request.aspect_ratio {
            Some(aspect) => CropSettings::centered(request.width, request.height, aspect),
            None => CropSettings::new(0, 0, request.width, request.height),
        };
        CropDecision::Confirmed(settings)
    }
}

/// Cancels every request, as a non-interactive session would
#[derive(Debug, Clone, Default)]
pub struct DeclineCrop;

#[async_trait]
impl CropPrompt for DeclineCrop {
    async fn request_crop(&self, _request: &CropRequest) -> CropDecision {
        CropDecision::Cancelled
    }
}

pub struct Cropper;

impl Cropper {
    /// Decide which crop, if any, the compressor should apply.
    ///
    /// An explicit crop already attached to the image wins. Otherwise the
    /// prompt is consulted when the profile asks for a crop.
    pub async fn resolve(
        existing: Option<CropSettings>,
        prompt: &dyn CropPrompt,
        profile: &UploadProfile,
        cancel_policy: CropCancelPolicy,
        request: CropRequest,
    ) -> Result<Option<CropSettings>, UploadError> {
        if let Some(crop) = existing {
            crop.validate()?;
            return Ok(Some(crop));
        }

        if !profile.wants_crop() {
            return Ok(None);
        }

        match prompt.request_crop(&request).await {
            CropDecision::Confirmed(crop) => {
                crop.validate()?;
                tracing::debug!(
                    file_name = %request.file_name,
                    x = crop.x,
                    y = crop.y,
                    width = crop.width,
                    height = crop.height,
                    "Crop confirmed"
                );
                Ok(Some(crop))
            }
            CropDecision::Cancelled if profile.required_crop() => {
                tracing::debug!(file_name = %request.file_name, "Required crop cancelled");
                Err(UploadError::CropIncomplete)
            }
            CropDecision::Cancelled => match cancel_policy {
                CropCancelPolicy::FallBackUncropped => {
                    tracing::debug!(
                        file_name = %request.file_name,
                        "Optional crop cancelled, compressing uncropped"
                    );
                    Ok(None)
                }
                CropCancelPolicy::Discard => Err(UploadError::CropIncomplete),
            },
        }
    }
}
