//! Configuration module
//!
//! Pipeline settings that are not part of an upload profile: how quality is
//! chosen, decode limits, parallelism and crop-cancel behaviour. Values come
//! from the environment (optionally a `.env` file) with sensible defaults.

use std::env;

use serde::Serialize;

use crate::constants::{DEFAULT_MAX_DECODE_PIXELS, DEFAULT_MAX_PARALLEL_FILES, MAX_PARALLEL_FILES};

/// How the compressor picks an encode quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityPolicy {
    /// Use the profile's fixed quality
    #[default]
    Profile,
    /// Derive quality from the input file size
    SizeHeuristic,
}

impl QualityPolicy {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(QualityPolicy::Profile),
            "size-heuristic" | "size_heuristic" | "heuristic" => Ok(QualityPolicy::SizeHeuristic),
            _ => Err(anyhow::anyhow!("Invalid quality policy: {}", s)),
        }
    }
}

/// What to do when the user cancels an optional crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropCancelPolicy {
    /// Compress the whole image instead
    #[default]
    FallBackUncropped,
    /// Leave the image unprocessed and report `CropIncomplete`
    Discard,
}

impl CropCancelPolicy {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.trim().to_lowercase().as_str() {
            "fallback" | "fall-back" | "uncropped" => Ok(CropCancelPolicy::FallBackUncropped),
            "discard" => Ok(CropCancelPolicy::Discard),
            _ => Err(anyhow::anyhow!("Invalid crop cancel policy: {}", s)),
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug, Serialize)]
pub struct PipelineConfig {
    pub quality_policy: QualityPolicy,
    /// Images with more pixels than this are refused before full decode
    pub max_decode_pixels: u64,
    /// Upper bound on files processed at the same time
    pub max_parallel_files: usize,
    /// Apply EXIF orientation before cropping and resizing
    pub auto_orient: bool,
    pub crop_cancel: CropCancelPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quality_policy: QualityPolicy::default(),
            max_decode_pixels: DEFAULT_MAX_DECODE_PIXELS,
            max_parallel_files: DEFAULT_MAX_PARALLEL_FILES,
            auto_orient: true,
            crop_cancel: CropCancelPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let quality_policy = match env::var("VITRINE_QUALITY_POLICY") {
            Ok(value) => QualityPolicy::parse(&value)?,
            Err(_) => QualityPolicy::default(),
        };

        let crop_cancel = match env::var("VITRINE_CROP_CANCEL") {
            Ok(value) => CropCancelPolicy::parse(&value)?,
            Err(_) => CropCancelPolicy::default(),
        };

        let config = PipelineConfig {
            quality_policy,
            max_decode_pixels: env::var("VITRINE_MAX_DECODE_PIXELS")
                .unwrap_or_else(|_| DEFAULT_MAX_DECODE_PIXELS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("VITRINE_MAX_DECODE_PIXELS must be a valid number"))?,
            max_parallel_files: env::var("VITRINE_MAX_PARALLEL_FILES")
                .unwrap_or_else(|_| DEFAULT_MAX_PARALLEL_FILES.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("VITRINE_MAX_PARALLEL_FILES must be a valid number")
                })?,
            auto_orient: env::var("VITRINE_AUTO_ORIENT")
                .unwrap_or_else(|_| "true".to_string())
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|_| anyhow::anyhow!("VITRINE_AUTO_ORIENT must be true or false"))?,
            crop_cancel,
        };

        config.validate()?;

        tracing::debug!(
            quality_policy = ?config.quality_policy,
            max_decode_pixels = config.max_decode_pixels,
            max_parallel_files = config.max_parallel_files,
            auto_orient = config.auto_orient,
            crop_cancel = ?config.crop_cancel,
            "Pipeline configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_parallel_files == 0 {
            return Err(anyhow::anyhow!(
                "VITRINE_MAX_PARALLEL_FILES must be at least 1"
            ));
        }

        if self.max_parallel_files > MAX_PARALLEL_FILES {
            return Err(anyhow::anyhow!(
                "VITRINE_MAX_PARALLEL_FILES must be at most {}, got {}",
                MAX_PARALLEL_FILES,
                self.max_parallel_files
            ));
        }

        if self.max_decode_pixels == 0 {
            return Err(anyhow::anyhow!(
                "VITRINE_MAX_DECODE_PIXELS must be greater than 0"
            ));
        }

        Ok(())
    }
}
