//! Output encoding.
//!
//! Trait-based encoder system so the pipeline can target JPEG (the default
//! download format, lossy, no alpha) or PNG (lossless) through one
//! interface. Input is the flattened RGBA canvas; the JPEG path drops the
//! alpha channel during conversion.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ComposeError;

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(ComposeError::invalid_param(
                "format",
                format!("unknown format: {}", s),
            )),
        }
    }
}

/// Quality settings for lossy encoding.
#[derive(Debug, Clone, Copy)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

impl EncoderQuality {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// Result of encoding an image.
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        let content_type = format.content_type();
        Self {
            data,
            format,
            content_type,
        }
    }
}

/// Trait for image encoders.
///
/// Implementations encode raw RGBA data to a specific format. Object-safe
/// for dynamic dispatch from the factory.
pub trait ImageEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Encode raw RGBA pixel data (4 bytes per pixel).
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ComposeError>;

    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate.
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ComposeError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        // JPEG carries no alpha channel
        let rgb_data = rgba_to_rgb(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.quality);

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ComposeError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), OutputFormat::Jpeg))
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate.
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        _quality: EncoderQuality,
    ) -> Result<EncodedImage, ComposeError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| ComposeError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), OutputFormat::Png))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on output format.
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Png => Box::new(PngEncoder),
        }
    }
}

/// Convert RGBA to RGB by discarding the alpha channel. The pipeline
/// flattens the canvas first, so alpha is uniformly opaque here.
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        rgb.push(chunk[0]);
        rgb.push(chunk[1]);
        rgb.push(chunk[2]);
    }

    rgb
}
