//! Upload profiles and the built-in registry.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::image::{normalize_content_type, OutputFormat};
use crate::constants::{BASE_IMAGE_TYPES, BYTES_PER_MB};
use crate::error::ProfileError;

/// Identifier of a built-in upload profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileId {
    Product,
    Avatar,
    Banner,
    Logo,
    Gallery,
    Default,
}

impl ProfileId {
    pub const ALL: [ProfileId; 6] = [
        ProfileId::Product,
        ProfileId::Avatar,
        ProfileId::Banner,
        ProfileId::Logo,
        ProfileId::Gallery,
        ProfileId::Default,
    ];

    /// Resolve a profile name. Unknown names resolve to `Default`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "product" => ProfileId::Product,
            "avatar" => ProfileId::Avatar,
            "banner" => ProfileId::Banner,
            "logo" => ProfileId::Logo,
            "gallery" => ProfileId::Gallery,
            "default" => ProfileId::Default,
            other => {
                tracing::debug!(profile = %other, "Unknown upload profile, using default");
                ProfileId::Default
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileId::Product => "product",
            ProfileId::Avatar => "avatar",
            ProfileId::Banner => "banner",
            ProfileId::Logo => "logo",
            ProfileId::Gallery => "gallery",
            ProfileId::Default => "default",
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width-to-height ratio a crop must follow, e.g. `16:5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, ProfileError> {
        if width == 0 || height == 0 {
            return Err(ProfileError::InvalidAspectRatio { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    /// Parse "W:H"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid aspect ratio: {}. Expected W:H", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid aspect width: {}", w))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid aspect height: {}", h))?;
        AspectRatio::new(width, height).map_err(|e| e.to_string())
    }
}

/// Raw profile values, checked by `UploadProfile::new`.
#[derive(Debug, Clone)]
pub struct ProfileSpec {
    pub aspect_ratio: Option<AspectRatio>,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
    pub max_size_mb: u64,
    pub allowed_formats: Vec<String>,
    pub output_format: OutputFormat,
    pub auto_open_crop: bool,
    pub required_crop: bool,
    pub multiple: bool,
}

/// Validated, immutable configuration for one class of upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadProfile {
    id: ProfileId,
    aspect_ratio: Option<AspectRatio>,
    max_width: u32,
    max_height: u32,
    quality: u8,
    max_size_mb: u64,
    allowed_formats: Vec<String>,
    output_format: OutputFormat,
    auto_open_crop: bool,
    required_crop: bool,
    multiple: bool,
}

impl UploadProfile {
    pub fn new(id: ProfileId, spec: ProfileSpec) -> Result<Self, ProfileError> {
        if spec.quality > 100 {
            return Err(ProfileError::QualityOutOfRange(spec.quality));
        }
        if spec.max_width == 0 || spec.max_height == 0 {
            return Err(ProfileError::ZeroBounds {
                width: spec.max_width,
                height: spec.max_height,
            });
        }
        if spec.max_size_mb == 0 {
            return Err(ProfileError::ZeroMaxSize);
        }
        if spec.max_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(ProfileError::MaxSizeTooLarge(spec.max_size_mb));
        }
        if spec.allowed_formats.is_empty() {
            return Err(ProfileError::NoAllowedFormats);
        }
        let mut allowed_formats = Vec::with_capacity(spec.allowed_formats.len());
        for format in &spec.allowed_formats {
            let normalized = normalize_content_type(format);
            if !normalized.starts_with("image/") || normalized.len() <= "image/".len() {
                return Err(ProfileError::InvalidFormat(format.clone()));
            }
            if !allowed_formats.contains(&normalized) {
                allowed_formats.push(normalized);
            }
        }
        if let Some(aspect) = spec.aspect_ratio {
            AspectRatio::new(aspect.width, aspect.height)?;
        } else if spec.required_crop {
            return Err(ProfileError::RequiredCropWithoutAspect);
        }

        Ok(Self {
            id,
            aspect_ratio: spec.aspect_ratio,
            max_width: spec.max_width,
            max_height: spec.max_height,
            quality: spec.quality,
            max_size_mb: spec.max_size_mb,
            allowed_formats,
            output_format: spec.output_format,
            auto_open_crop: spec.auto_open_crop,
            required_crop: spec.required_crop,
            multiple: spec.multiple,
        })
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    /// Encode quality, 0-100
    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn max_size_mb(&self) -> u64 {
        self.max_size_mb
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Normalized (lowercase) MIME types
    pub fn allowed_formats(&self) -> &[String] {
        &self.allowed_formats
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn auto_open_crop(&self) -> bool {
        self.auto_open_crop
    }

    pub fn required_crop(&self) -> bool {
        self.required_crop
    }

    pub fn multiple(&self) -> bool {
        self.multiple
    }

    /// Whether the cropper must be consulted before compression
    pub fn wants_crop(&self) -> bool {
        self.auto_open_crop || self.required_crop
    }
}

fn formats(extra: &[&str]) -> Vec<String> {
    BASE_IMAGE_TYPES
        .iter()
        .chain(extra.iter())
        .map(|s| s.to_string())
        .collect()
}

fn builtin_spec(id: ProfileId) -> ProfileSpec {
    match id {
        ProfileId::Product => ProfileSpec {
            aspect_ratio: Some(AspectRatio::SQUARE),
            max_width: 1200,
            max_height: 1200,
            quality: 85,
            max_size_mb: 5,
            allowed_formats: formats(&[]),
            output_format: OutputFormat::Jpeg,
            auto_open_crop: true,
            required_crop: false,
            multiple: true,
        },
        ProfileId::Avatar => ProfileSpec {
            aspect_ratio: Some(AspectRatio::SQUARE),
            max_width: 400,
            max_height: 400,
            quality: 90,
            max_size_mb: 2,
            allowed_formats: formats(&[]),
            output_format: OutputFormat::Jpeg,
            auto_open_crop: true,
            required_crop: true,
            multiple: false,
        },
        ProfileId::Banner => ProfileSpec {
            aspect_ratio: Some(AspectRatio {
                width: 16,
                height: 5,
            }),
            max_width: 1920,
            max_height: 600,
            quality: 85,
            max_size_mb: 8,
            allowed_formats: formats(&[]),
            output_format: OutputFormat::Jpeg,
            auto_open_crop: true,
            required_crop: true,
            multiple: false,
        },
        ProfileId::Logo => ProfileSpec {
            aspect_ratio: None,
            max_width: 512,
            max_height: 512,
            quality: 95,
            max_size_mb: 2,
            allowed_formats: formats(&["image/gif"]),
            output_format: OutputFormat::Auto,
            auto_open_crop: false,
            required_crop: false,
            multiple: false,
        },
        ProfileId::Gallery => ProfileSpec {
            aspect_ratio: None,
            max_width: 1920,
            max_height: 1920,
            quality: 85,
            max_size_mb: 10,
            allowed_formats: formats(&["image/gif"]),
            output_format: OutputFormat::WebP,
            auto_open_crop: false,
            required_crop: false,
            multiple: true,
        },
        ProfileId::Default => ProfileSpec {
            aspect_ratio: None,
            max_width: 1920,
            max_height: 1080,
            quality: 85,
            max_size_mb: 5,
            allowed_formats: formats(&[]),
            output_format: OutputFormat::Jpeg,
            auto_open_crop: false,
            required_crop: false,
            multiple: false,
        },
    }
}

/// Static registry of the built-in profiles
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<UploadProfile>,
    default: UploadProfile,
}

impl ProfileRegistry {
    /// Build the registry from the built-in profile table.
    pub fn builtin() -> Result<Self, ProfileError> {
        let default = UploadProfile::new(ProfileId::Default, builtin_spec(ProfileId::Default))?;
        let profiles = ProfileId::ALL
            .iter()
            .filter(|id| **id != ProfileId::Default)
            .map(|id| UploadProfile::new(*id, builtin_spec(*id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { profiles, default })
    }

    pub fn get(&self, id: ProfileId) -> &UploadProfile {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .unwrap_or(&self.default)
    }

    /// Look up a profile by name, falling back to the default profile.
    pub fn resolve(&self, name: &str) -> &UploadProfile {
        self.get(ProfileId::parse(name))
    }

    pub fn default_profile(&self) -> &UploadProfile {
        &self.default
    }

    /// All profiles, default last
    pub fn iter(&self) -> impl Iterator<Item = &UploadProfile> {
        self.profiles.iter().chain(std::iter::once(&self.default))
    }
}
