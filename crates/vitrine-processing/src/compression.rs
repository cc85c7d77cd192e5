use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use vitrine_core::constants::BYTES_PER_MB;
use vitrine_core::{
    CompressionStats, CropSettings, OutputFormat, PipelineConfig, QualityPolicy, UploadError,
    UploadProfile,
};

use crate::image::{DecodedImage, ImageProcessor, ImageTransformer};

/// Picks the encode quality for a file
pub struct QualitySelector;

impl QualitySelector {
    /// Quality derived from the input size: bigger inputs get compressed harder.
    pub fn size_heuristic(original_size: u64) -> u8 {
        match original_size {
            s if s > 5 * BYTES_PER_MB => 70,
            s if s > 2 * BYTES_PER_MB => 80,
            s if s > BYTES_PER_MB => 85,
            _ => 90,
        }
    }

    pub fn select_quality(policy: QualityPolicy, profile_quality: u8, original_size: u64) -> u8 {
        match policy {
            QualityPolicy::Profile => profile_quality,
            QualityPolicy::SizeHeuristic => Self::size_heuristic(original_size),
        }
    }
}

/// Format selector based on image properties
pub struct FormatSelector;

impl FormatSelector {
    /// Resolve `Auto` to a concrete format; explicit formats pass through.
    pub fn select_format(img: &DynamicImage, requested_format: OutputFormat) -> OutputFormat {
        if requested_format != OutputFormat::Auto {
            return requested_format;
        }

        if Self::has_meaningful_alpha(img) {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    /// Check if image has meaningful alpha channel (not fully opaque)
    pub fn has_meaningful_alpha(img: &DynamicImage) -> bool {
        if !img.color().has_alpha() {
            return false;
        }
        img.to_rgba8().pixels().any(|p| p[3] < 255)
    }
}

/// Output of one compression run
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    #[serde(skip)]
    pub data: Bytes,
    /// Concrete format, never `Auto`
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    #[serde(flatten)]
    pub stats: CompressionStats,
}

impl CompressionResult {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type(), STANDARD.encode(&self.data))
    }
}

/// Stateless encoders
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode pixels in a concrete format
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, UploadError> {
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img),
            OutputFormat::WebP => Self::compress_webp(img, quality),
            OutputFormat::Auto => {
                let resolved = FormatSelector::select_format(img, format);
                Self::encode(img, resolved, quality)
            }
        }
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, UploadError> {
        let rgb_img = if img.color().has_alpha() {
            Self::flatten_onto_white(img).to_rgb8()
        } else {
            img.to_rgb8()
        };
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let encode_err = |e: std::io::Error| UploadError::Encode(format!("JPEG: {}", e));
        let mut comp = comp.start_compress(Vec::new()).map_err(encode_err)?;
        comp.write_scanlines(&rgb_img).map_err(encode_err)?;
        let jpeg_data = comp.finish().map_err(encode_err)?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to PNG (lossless, quality ignored)
    fn compress_png(img: &DynamicImage) -> Result<Bytes, UploadError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| UploadError::Encode(format!("PNG: {}", e)))?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to lossy WebP
    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes, UploadError> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder
            .encode_simple(false, quality as f32)
            .map_err(|e| UploadError::Encode(format!("WebP: {:?}", e)))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    /// Composite transparent pixels over white so JPEG output has no dark halos
    fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
        DynamicImage::ImageRgba8(canvas)
    }
}

/// Decode, crop, resize and encode in one call
#[derive(Debug, Clone)]
pub struct Compressor {
    quality_policy: QualityPolicy,
    max_decode_pixels: u64,
    auto_orient: bool,
}

impl Compressor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            quality_policy: config.quality_policy,
            max_decode_pixels: config.max_decode_pixels,
            auto_orient: config.auto_orient,
        }
    }

    pub fn quality_policy(&self) -> QualityPolicy {
        self.quality_policy
    }

    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage, UploadError> {
        ImageProcessor::decode(data, self.max_decode_pixels, self.auto_orient)
    }

    /// Quality this compressor would use for `profile` and an input of `original_size` bytes
    pub fn quality_for(&self, profile: &UploadProfile, original_size: u64) -> u8 {
        QualitySelector::select_quality(self.quality_policy, profile.quality(), original_size)
    }

    pub fn compress(
        &self,
        data: &[u8],
        crop: Option<&CropSettings>,
        bounds: (u32, u32),
        format: OutputFormat,
        quality: u8,
    ) -> Result<CompressionResult, UploadError> {
        let decoded = self.decode(data)?;
        self.compress_decoded(decoded, crop, bounds, format, quality)
    }

    /// Compress with the bounds, format and quality a profile asks for
    pub fn compress_for_profile(
        &self,
        data: &[u8],
        crop: Option<&CropSettings>,
        profile: &UploadProfile,
    ) -> Result<CompressionResult, UploadError> {
        self.compress(
            data,
            crop,
            (profile.max_width(), profile.max_height()),
            profile.output_format(),
            self.quality_for(profile, data.len() as u64),
        )
    }

    pub fn compress_decoded(
        &self,
        decoded: DecodedImage,
        crop: Option<&CropSettings>,
        (max_width, max_height): (u32, u32),
        format: OutputFormat,
        quality: u8,
    ) -> Result<CompressionResult, UploadError> {
        let original_size = decoded.metadata.size_bytes;
        let img = ImageTransformer::prepare(decoded.image, crop, max_width, max_height)?;
        let format = FormatSelector::select_format(&img, format);
        let (width, height) = img.dimensions();

        let data = ImageCompressor::encode(&img, format, quality)?;
        let stats = CompressionStats::new(original_size, data.len() as u64);

        tracing::debug!(
            format = ?format,
            width = width,
            height = height,
            quality = quality,
            original_size = stats.original_size,
            compressed_size = stats.compressed_size,
            compression_ratio = stats.compression_ratio,
            "Image compressed"
        );

        Ok(CompressionResult {
            data,
            format,
            width,
            height,
            quality,
            stats,
        })
    }
}
