//! Support code for the `vitrine` binary: tracing setup, reading local files
//! and the directory sink that stores finalized uploads.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use vitrine_core::models::content_types_for_extension;
use vitrine_core::{
    CompressionStats, CropSettings, ErrorMetadata, ProfileId, SourceFile, UploadProfile,
    ValidationFailure,
};
use vitrine_processing::{FileOutcome, Finalized, UploadSink};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// MIME type implied by the file extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| content_types_for_extension(e).first().copied())
        .unwrap_or("application/octet-stream")
}

/// Read a local file into a `SourceFile`
pub async fn load_source(path: &Path) -> anyhow::Result<SourceFile> {
    let data = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(SourceFile::new(name, content_type_for_path(path), data))
}

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub profile: ProfileId,
    pub finalized_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManifestEntry {
    Processed {
        file_name: String,
        output: String,
        content_type: &'static str,
        width: u32,
        height: u32,
        quality: u8,
        crop: Option<CropSettings>,
        stats: CompressionStats,
    },
    Failed {
        file_name: String,
        error_code: &'static str,
        message: String,
        recoverable: bool,
        suggested_action: Option<&'static str>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        reasons: Vec<ValidationFailure>,
    },
}

/// Writes every compressed output into a directory, plus a manifest
#[derive(Debug, Clone)]
pub struct DirectorySink {
    out_dir: PathBuf,
}

impl DirectorySink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn output_name(index: usize, file_name: &str, extension: &str) -> String {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        format!("{:02}-{}.{}", index + 1, stem, extension)
    }

    async fn store(&self, index: usize, outcome: &FileOutcome) -> anyhow::Result<ManifestEntry> {
        let processed = match &outcome.result {
            Ok(processed) => processed,
            Err(err) => {
                return Ok(ManifestEntry::Failed {
                    file_name: outcome.file_name.clone(),
                    error_code: err.error_code(),
                    message: err.client_message(),
                    recoverable: err.is_recoverable(),
                    suggested_action: err.suggested_action(),
                    reasons: err.validation_failures().to_vec(),
                })
            }
        };

        let result = &processed.result;
        let output = Self::output_name(index, &outcome.file_name, result.format.extension());
        let path = self.out_dir.join(&output);

        fs::write(&path, &result.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(
            file_name = %outcome.file_name,
            output = %output,
            bytes = result.data.len(),
            "Stored processed image"
        );

        Ok(ManifestEntry::Processed {
            file_name: outcome.file_name.clone(),
            output,
            content_type: result.content_type(),
            width: result.width,
            height: result.height,
            quality: result.quality,
            crop: processed.crop,
            stats: result.stats,
        })
    }
}

#[async_trait]
impl UploadSink for DirectorySink {
    async fn deliver(&self, profile: &UploadProfile, upload: Finalized) -> anyhow::Result<()> {
        fs::create_dir_all(&self.out_dir).await.with_context(|| {
            format!("Failed to create output directory {}", self.out_dir.display())
        })?;

        let outcomes = match upload {
            Finalized::Single(outcome) => vec![outcome],
            Finalized::Batch(report) => report.outcomes,
        };

        let mut files = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.iter().enumerate() {
            files.push(self.store(index, outcome).await?);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let manifest = Manifest {
            profile: profile.id(),
            finalized_at: Utc::now(),
            succeeded,
            failed: outcomes.len() - succeeded,
            files,
        };

        let json = serde_json::to_vec_pretty(&manifest).context("Serialize manifest")?;
        let path = self.out_dir.join(MANIFEST_FILE);
        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(
            out_dir = %self.out_dir.display(),
            succeeded = manifest.succeeded,
            failed = manifest.failed,
            "Upload written"
        );
        Ok(())
    }
}
