//! Test helpers: pipelines, prompts and sinks for integration tests.
//!
//! Run from workspace root: `cargo test -p vitrine-processing --test pipeline_test`.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vitrine_core::{
    OutputFormat, PipelineConfig, ProfileId, ProfileRegistry, ProfileSpec, SourceFile,
    UploadProfile,
};
use vitrine_processing::{
    CenteredCrop, CropDecision, CropPrompt, CropRequest, Finalized, UploadPipeline, UploadSink,
};

pub fn profile(id: ProfileId) -> UploadProfile {
    ProfileRegistry::builtin()
        .expect("builtin profiles")
        .get(id)
        .clone()
}

/// Unconstrained profile bounded to `max_width` x `max_height`
pub fn bounded_profile(max_width: u32, max_height: u32) -> UploadProfile {
    UploadProfile::new(
        ProfileId::Default,
        ProfileSpec {
            aspect_ratio: None,
            max_width,
            max_height,
            quality: 85,
            max_size_mb: 10,
            allowed_formats: vec!["image/jpeg".to_string(), "image/png".to_string()],
            output_format: OutputFormat::Jpeg,
            auto_open_crop: false,
            required_crop: false,
            multiple: true,
        },
    )
    .expect("valid profile")
}

pub fn pipeline(profile: UploadProfile, prompt: Arc<dyn CropPrompt>) -> UploadPipeline {
    UploadPipeline::new(profile, PipelineConfig::default(), prompt)
}

pub fn png_file(name: &str, width: u32, height: u32) -> SourceFile {
    SourceFile::new(name, "image/png", fixtures::create_test_png(width, height))
}

/// Counts how often it is asked, then behaves like `CenteredCrop`
#[derive(Default)]
pub struct CountingPrompt {
    pub calls: AtomicUsize,
}

impl CountingPrompt {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CropPrompt for CountingPrompt {
    async fn request_crop(&self, request: &CropRequest) -> CropDecision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CenteredCrop.request_crop(request).await
    }
}

/// Blocks inside the crop step until released
#[derive(Default)]
pub struct GatedPrompt {
    pub asked: Notify,
    pub release: Notify,
}

#[async_trait]
impl CropPrompt for GatedPrompt {
    async fn request_crop(&self, request: &CropRequest) -> CropDecision {
        self.asked.notify_one();
        self.release.notified().await;
        CenteredCrop.request_crop(request).await
    }
}

/// Keeps every delivered upload
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(ProfileId, Finalized)>>,
}

#[async_trait]
impl UploadSink for RecordingSink {
    async fn deliver(&self, profile: &UploadProfile, upload: Finalized) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push((profile.id(), upload));
        Ok(())
    }
}
