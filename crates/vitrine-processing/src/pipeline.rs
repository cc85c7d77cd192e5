//! Upload pipeline orchestrator
//!
//! Runs every selected file through validation, the crop step and the
//! compressor. Files are independent: one failure never stops the others,
//! and the report lists outcomes in submission order.
//!
//! Tasks hold only a weak handle to the upload scope. After
//! [`TeardownHandle::teardown`] they stop at the next checkpoint and their
//! results are discarded.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::Semaphore;
use uuid::Uuid;
use vitrine_core::{
    CropCancelPolicy, CropSettings, ErrorMetadata, LogLevel, PipelineConfig, ProfileId,
    SourceFile, UploadError, UploadProfile, ValidationFailure,
};

use crate::compression::{CompressionResult, Compressor};
use crate::cropper::{CropPrompt, CropRequest, Cropper};
use crate::pending::PendingImage;
use crate::resource::ResourceTracker;
use crate::validator::UploadValidator;

/// A file that made it through the whole pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedImage {
    pub id: Uuid,
    pub file_name: String,
    pub profile: ProfileId,
    /// Object URL of the compressed output
    pub object_url: String,
    pub crop: Option<CropSettings>,
    #[serde(flatten)]
    pub result: CompressionResult,
}

impl ProcessedImage {
    fn from_pending(pending: &PendingImage, profile: ProfileId) -> Option<Self> {
        let result = pending.result()?.clone();
        Some(Self {
            id: pending.id(),
            file_name: pending.file_name().to_string(),
            profile,
            object_url: pending.output_url().unwrap_or_default().to_string(),
            crop: pending.crop().copied(),
            result,
        })
    }

    pub fn content_type(&self) -> &'static str {
        self.result.content_type()
    }

    pub fn data_url(&self) -> String {
        self.result.data_url()
    }
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub id: Uuid,
    pub file_name: String,
    pub result: Result<ProcessedImage, UploadError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-file outcomes of one `process_all` run, in submission order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ProcessedImage> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileOutcome, &UploadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }
}

/// What the pipeline hands over when the user is done
#[derive(Debug, Clone)]
pub enum Finalized {
    /// Single-file profiles: the one file, success or failure
    Single(FileOutcome),
    Batch(BatchReport),
}

/// Receives finalized uploads, e.g. to persist them
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn deliver(&self, profile: &UploadProfile, upload: Finalized) -> anyhow::Result<()>;
}

/// Kept alive for as long as the upload scope is
#[derive(Debug)]
struct ScopeToken;

/// Ends an upload scope, possibly from another task while processing runs
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    scope: Arc<Mutex<Option<Arc<ScopeToken>>>>,
    tracker: ResourceTracker,
}

impl TeardownHandle {
    fn new(tracker: ResourceTracker) -> Self {
        Self {
            scope: Arc::new(Mutex::new(Some(Arc::new(ScopeToken)))),
            tracker,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<ScopeToken>>> {
        self.scope.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Upload scope lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn weak(&self) -> Weak<ScopeToken> {
        self.slot().as_ref().map(Arc::downgrade).unwrap_or_default()
    }

    pub fn is_live(&self) -> bool {
        self.slot().is_some()
    }

    /// Run `f` only while the scope is live. Teardown waits until `f` returns.
    fn while_live<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let slot = self.slot();
        slot.as_ref()?;
        Some(f())
    }

    /// End the scope and revoke every object URL. Returns how many were revoked.
    pub fn teardown(&self) -> usize {
        let ended = self.slot().take().is_some();
        let released = self.tracker.revoke_all();
        if ended {
            tracing::info!(released = released, "Upload scope torn down");
        }
        released
    }
}

fn ensure_live(scope: &Weak<ScopeToken>) -> Result<(), UploadError> {
    scope.upgrade().map(|_| ()).ok_or(UploadError::Cancelled)
}

fn log_failure(file_name: &str, err: &UploadError) {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(
                file_name = %file_name,
                error_code = code,
                error = %err,
                "File not processed"
            )
        }
        LogLevel::Warn => {
            tracing::warn!(
                file_name = %file_name,
                error_code = code,
                error = %err,
                "File not processed"
            )
        }
        LogLevel::Error => {
            tracing::error!(
                file_name = %file_name,
                error_code = code,
                error = %err,
                "File not processed"
            )
        }
    }
}

/// Everything one file task needs, detached from the pipeline
#[derive(Clone)]
struct TaskContext {
    profile: Arc<UploadProfile>,
    compressor: Arc<Compressor>,
    prompt: Arc<dyn CropPrompt>,
    crop_cancel: CropCancelPolicy,
    semaphore: Arc<Semaphore>,
    scope: Weak<ScopeToken>,
}

struct FileJob {
    source: SourceFile,
    crop: Option<CropSettings>,
}

type TaskOutput = (Option<CropSettings>, CompressionResult);

async fn process_file(job: FileJob, ctx: TaskContext) -> Result<TaskOutput, UploadError> {
    UploadValidator::validate(&job.source, &ctx.profile).into_result()?;

    let permit = ctx
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| UploadError::Cancelled)?;
    ensure_live(&ctx.scope)?;

    let compressor = ctx.compressor.clone();
    let data = job.source.data.clone();
    let decoded = tokio::task::spawn_blocking(move || compressor.decode(&data))
        .await
        .map_err(|e| UploadError::Decode(format!("Decode task failed: {}", e)))??;
    drop(permit);
    ensure_live(&ctx.scope)?;

    // No permit held while waiting on the user
    let request = CropRequest {
        file_name: job.source.name.clone(),
        width: decoded.metadata.width,
        height: decoded.metadata.height,
        aspect_ratio: ctx.profile.aspect_ratio(),
        required: ctx.profile.required_crop(),
    };
    let crop = Cropper::resolve(
        job.crop,
        ctx.prompt.as_ref(),
        &ctx.profile,
        ctx.crop_cancel,
        request,
    )
    .await?;
    ensure_live(&ctx.scope)?;

    let _permit = ctx
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| UploadError::Cancelled)?;
    ensure_live(&ctx.scope)?;

    let quality = ctx.compressor.quality_for(&ctx.profile, job.source.size());
    let bounds = (ctx.profile.max_width(), ctx.profile.max_height());
    let format = ctx.profile.output_format();
    let compressor = ctx.compressor.clone();
    let result = tokio::task::spawn_blocking(move || {
        compressor.compress_decoded(decoded, crop.as_ref(), bounds, format, quality)
    })
    .await
    .map_err(|e| UploadError::Encode(format!("Compression task failed: {}", e)))??;

    ensure_live(&ctx.scope)?;
    Ok((crop, result))
}

/// One upload scope: a profile, its selected files and their object URLs
pub struct UploadPipeline {
    profile: Arc<UploadProfile>,
    config: PipelineConfig,
    compressor: Arc<Compressor>,
    prompt: Arc<dyn CropPrompt>,
    tracker: ResourceTracker,
    scope: TeardownHandle,
    semaphore: Arc<Semaphore>,
    pending: Vec<PendingImage>,
    rejected: Vec<FileOutcome>,
}

impl UploadPipeline {
    pub fn new(
        profile: UploadProfile,
        config: PipelineConfig,
        prompt: Arc<dyn CropPrompt>,
    ) -> Self {
        let tracker = ResourceTracker::new();
        let scope = TeardownHandle::new(tracker.clone());

        tracing::debug!(
            profile = %profile.id(),
            max_parallel_files = config.max_parallel_files,
            "Upload pipeline created"
        );

        Self {
            profile: Arc::new(profile),
            compressor: Arc::new(Compressor::new(&config)),
            semaphore: Arc::new(Semaphore::new(config.max_parallel_files.max(1))),
            config,
            prompt,
            tracker,
            scope,
            pending: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn profile(&self) -> &UploadProfile {
        &self.profile
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.scope.clone()
    }

    pub fn pending(&self) -> &[PendingImage] {
        &self.pending
    }

    pub fn get(&self, id: Uuid) -> Option<&PendingImage> {
        self.pending.iter().find(|p| p.id() == id)
    }

    /// Select files. A single-file profile keeps only the newest selection:
    /// the previous file is released, the first new file replaces it and any
    /// further files are rejected with `TooManyFiles`.
    pub fn add_files(&mut self, files: Vec<SourceFile>) -> Result<Vec<Uuid>, UploadError> {
        if !self.scope.is_live() {
            return Err(UploadError::Cancelled);
        }
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(files.len());
        let mut files = files.into_iter();

        if !self.profile.multiple() {
            if !self.pending.is_empty() {
                tracing::debug!(profile = %self.profile.id(), "Replacing selected file");
            }
            self.pending.clear();
            self.rejected.clear();

            if let Some(first) = files.next() {
                let pending = PendingImage::new(first, self.tracker.clone());
                ids.push(pending.id());
                self.pending.push(pending);
            }

            for extra in files {
                let id = Uuid::new_v4();
                tracing::debug!(
                    file_name = %extra.name,
                    "Rejecting extra file for single-file profile"
                );
                ids.push(id);
                self.rejected.push(FileOutcome {
                    id,
                    file_name: extra.name,
                    result: Err(UploadError::Validation(vec![
                        ValidationFailure::TooManyFiles { max: 1 },
                    ])),
                });
            }
        } else {
            for file in files {
                let pending = PendingImage::new(file, self.tracker.clone());
                ids.push(pending.id());
                self.pending.push(pending);
            }
        }

        Ok(ids)
    }

    pub fn set_crop(&mut self, id: Uuid, crop: CropSettings) -> Result<(), UploadError> {
        self.pending
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or(UploadError::NotFound(id))?
            .set_crop(crop)
    }

    /// Drop a file from the selection, releasing its object URLs.
    pub fn remove(&mut self, id: Uuid) -> Result<(), UploadError> {
        if let Some(index) = self.pending.iter().position(|p| p.id() == id) {
            self.pending.remove(index);
            return Ok(());
        }
        if let Some(index) = self.rejected.iter().position(|o| o.id == id) {
            self.rejected.remove(index);
            return Ok(());
        }
        Err(UploadError::NotFound(id))
    }

    fn task_context(&self) -> TaskContext {
        TaskContext {
            profile: self.profile.clone(),
            compressor: self.compressor.clone(),
            prompt: self.prompt.clone(),
            crop_cancel: self.config.crop_cancel,
            semaphore: self.semaphore.clone(),
            scope: self.scope.weak(),
        }
    }

    /// Process every file not yet processed. Already processed files are
    /// reported again with their stored result.
    pub async fn process_all(&mut self) -> BatchReport {
        let ctx = self.task_context();

        let mut handles = Vec::new();
        for (index, pending) in self.pending.iter().enumerate() {
            if pending.is_processed() {
                continue;
            }
            let job = FileJob {
                source: pending.source().clone(),
                crop: pending.crop().copied(),
            };
            handles.push((index, tokio::spawn(process_file(job, ctx.clone()))));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for (index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(UploadError::Encode(format!("Processing task failed: {}", e))),
            };
            results.insert(index, result);
        }

        let profile_id = self.profile.id();
        let mut outcomes = Vec::with_capacity(self.pending.len() + self.rejected.len());

        for (index, pending) in self.pending.iter_mut().enumerate() {
            let result = match results.remove(&index) {
                Some(Ok((crop, compressed))) => self
                    .scope
                    .while_live(|| {
                        pending.attach_result(compressed, crop);
                    })
                    .and_then(|()| ProcessedImage::from_pending(pending, profile_id))
                    .ok_or(UploadError::Cancelled),
                Some(Err(e)) => Err(e),
                None => ProcessedImage::from_pending(pending, profile_id)
                    .ok_or(UploadError::Cancelled),
            };

            if let Err(ref e) = result {
                log_failure(pending.file_name(), e);
            }

            outcomes.push(FileOutcome {
                id: pending.id(),
                file_name: pending.file_name().to_string(),
                result,
            });
        }
        outcomes.append(&mut self.rejected);

        if !self.scope.is_live() {
            self.pending.clear();
        }

        let report = BatchReport { outcomes };
        tracing::info!(
            profile = %profile_id,
            total = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch processed"
        );
        report
    }

    /// Select `files` and process the whole selection
    pub async fn process_files(
        &mut self,
        files: Vec<SourceFile>,
    ) -> Result<BatchReport, UploadError> {
        self.add_files(files)?;
        Ok(self.process_all().await)
    }

    /// Process what is left and hand the outcome to `sink`.
    pub async fn finalize(&mut self, sink: &dyn UploadSink) -> anyhow::Result<()> {
        let report = self.process_all().await;

        let upload = if self.profile.multiple() {
            Finalized::Batch(report)
        } else {
            let mut outcomes = report.outcomes.into_iter();
            let profile_id = self.profile.id();
            let outcome = outcomes
                .next()
                .with_context(|| format!("No file selected for the {} profile", profile_id))?;
            for extra in outcomes {
                tracing::warn!(file_name = %extra.file_name, "Extra file not delivered");
            }
            Finalized::Single(outcome)
        };

        sink.deliver(&self.profile, upload)
            .await
            .context("Failed to deliver finalized upload")?;

        tracing::info!(profile = %self.profile.id(), "Upload finalized");
        Ok(())
    }

    /// End the scope: revoke every object URL and forget the selection.
    pub fn teardown(&mut self) -> usize {
        let released = self.scope.teardown();
        self.pending.clear();
        self.rejected.clear();
        released
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
