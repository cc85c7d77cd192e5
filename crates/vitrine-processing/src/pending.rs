use bytes::Bytes;
use uuid::Uuid;
use vitrine_core::models::normalize_content_type;
use vitrine_core::{CompressionStats, CropSettings, SourceFile, UploadError};

use crate::compression::CompressionResult;
use crate::resource::ResourceTracker;

/// A selected file waiting for, or holding the result of, processing.
///
/// Owns the object URLs it creates; they are revoked when the image is
/// dropped, whichever way it leaves the pipeline.
#[derive(Debug)]
pub struct PendingImage {
    id: Uuid,
    source: SourceFile,
    preview_url: String,
    crop: Option<CropSettings>,
    output_url: Option<String>,
    result: Option<CompressionResult>,
    tracker: ResourceTracker,
}

impl PendingImage {
    pub fn new(source: SourceFile, tracker: ResourceTracker) -> Self {
        let preview_url = tracker.create_object_url(
            source.data.clone(),
            normalize_content_type(&source.content_type),
        );

        Self {
            id: Uuid::new_v4(),
            source,
            preview_url,
            crop: None,
            output_url: None,
            result: None,
            tracker,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn file_name(&self) -> &str {
        &self.source.name
    }

    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    pub fn crop(&self) -> Option<&CropSettings> {
        self.crop.as_ref()
    }

    /// Attach the user's crop. Frozen once the image has been processed.
    pub fn set_crop(&mut self, crop: CropSettings) -> Result<(), UploadError> {
        if self.is_processed() {
            return Err(UploadError::InvalidCrop(
                "Image has already been processed".to_string(),
            ));
        }
        crop.validate()?;
        self.crop = Some(crop);
        Ok(())
    }

    pub fn output_url(&self) -> Option<&str> {
        self.output_url.as_deref()
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        self.result.as_ref()
    }

    pub fn stats(&self) -> Option<&CompressionStats> {
        self.result.as_ref().map(|r| &r.stats)
    }

    pub fn is_processed(&self) -> bool {
        self.result.is_some()
    }

    /// Store the compressed output, freeze the crop that produced it and
    /// expose the output under a new object URL.
    pub fn attach_result(&mut self, result: CompressionResult, crop: Option<CropSettings>) -> &str {
        if let Some(previous) = self.output_url.take() {
            self.tracker.revoke(&previous);
        }

        let url = self
            .tracker
            .create_object_url(Bytes::clone(&result.data), result.content_type());
        self.crop = crop;
        self.result = Some(result);
        self.output_url.insert(url)
    }

    /// Revoke every URL this image created. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.tracker.revoke(&self.preview_url);
        if let Some(url) = self.output_url.take() {
            self.tracker.revoke(&url);
        }
    }
}

impl Drop for PendingImage {
    fn drop(&mut self) {
        self.release();
    }
}
