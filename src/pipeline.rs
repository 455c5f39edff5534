//! End-to-end compose pipeline.
//!
//! Orchestrates one run: decode the uploaded photograph, prepare the
//! square canvas, paint the text band, lay out and composite the overlay
//! graphics, stamp the certification text, then flatten and encode the
//! result for download.
//!
//! One run owns its canvas buffer exclusively; nothing is shared or
//! cached across runs. Fatal conditions (bad dimensions, undecodable
//! photo) stop before any canvas mutation; asset and font problems
//! degrade gracefully and are reported as warnings on the result.
//!
//! # Example
//!
//! ```ignore
//! use imprint::config::ComposeParams;
//! use imprint::pipeline::Composer;
//!
//! let params = ComposeParams::from_yaml(yaml)?;
//! let composer = Composer::new(params)?;
//! let result = composer.compose(&photo_bytes, &[logo_bytes])?;
//! std::fs::write(&result.file_name, &result.data)?;
//! ```

use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

use crate::band;
use crate::canvas;
use crate::compositor::{self, Compositor, Layer};
use crate::config::{ComposeParams, OverlayParams, OverlaySource};
use crate::encoder::{EncoderFactory, EncoderQuality};
use crate::error::{ComposeError, ComposeWarning};
use crate::layout::{self, OverlayItem};
use crate::text::{
    parse_hex_color, render_outlined_text, Color, FontLibrary, FontStyle, TextOptions,
};

/// Problems loading one overlay asset. Always downgraded to a
/// `MissingAsset` warning; the rest of the pipeline proceeds.
#[derive(Debug, Error)]
enum AssetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("upload index {index} out of range")]
    MissingUpload { index: usize },
}

/// The composed, encoded output of one run.
#[derive(Debug)]
pub struct ComposedImage {
    /// Encoded file bytes, ready for download
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Non-fatal conditions encountered, in pipeline order
    pub warnings: Vec<ComposeWarning>,
}

/// A configured compose pipeline.
///
/// Parameters are validated once at construction; `compose` can then be
/// called per photograph.
pub struct Composer {
    params: ComposeParams,
    fonts: FontLibrary,
}

impl Composer {
    /// Validate parameters and resolve fonts.
    pub fn new(params: ComposeParams) -> Result<Self, ComposeError> {
        params.validate()?;
        Ok(Self {
            params,
            fonts: FontLibrary::load(),
        })
    }

    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    /// Run the full pipeline on one photograph.
    ///
    /// `uploads` backs `OverlaySource::Upload { index }` references in the
    /// parameters.
    pub fn compose(&self, photo: &[u8], uploads: &[Vec<u8>]) -> Result<ComposedImage, ComposeError> {
        let photo_img = decode_image(photo)?;
        let mut canvas = canvas::prepare(
            &photo_img,
            self.params.target_size,
            &self.params.crop.to_crop_mode(),
        )?;
        let canvas_size = (canvas.width(), canvas.height());

        let mut warnings = Vec::new();
        let mut reserved = Vec::new();

        // The band is painted first so overlays stacked above its
        // footprint land on top of it.
        if let Some(band_params) = &self.params.band {
            let spec = band_params.to_spec()?;
            let (region, band_warnings) = band::render(&mut canvas, &spec, &self.fonts)?;
            reserved.push(region);
            warnings.extend(band_warnings);
        }

        // Load overlay assets; a missing or unreadable asset is skipped.
        let mut loaded: Vec<(RgbaImage, &OverlayParams)> = Vec::new();
        for overlay in &self.params.overlays {
            match load_overlay(&overlay.source, uploads) {
                Ok(img) => loaded.push((img, overlay)),
                Err(err) => {
                    let warning = ComposeWarning::MissingAsset {
                        path: source_label(&overlay.source),
                    };
                    tracing::warn!(error = %err, "overlay skipped");
                    warnings.push(warning);
                }
            }
        }

        let items: Vec<OverlayItem> = loaded
            .iter()
            .map(|(img, p)| OverlayItem {
                source_width: img.width(),
                source_height: img.height(),
                scale: p.scale(),
                anchor: p.anchor,
                margin: p.margin,
                group: p.group,
            })
            .collect();

        let placements = layout::layout(canvas_size, &items, &reserved);

        let mut compositor = Compositor::new();
        for ((img, p), placement) in loaded.iter().zip(placements.iter()) {
            if placement.width == 0 || placement.height == 0 {
                continue;
            }
            let resized = if (img.width(), img.height()) == (placement.width, placement.height) {
                img.clone()
            } else {
                DynamicImage::ImageRgba8(img.clone())
                    .resize_exact(placement.width, placement.height, FilterType::Lanczos3)
                    .to_rgba8()
            };
            tracing::debug!(
                x = placement.x,
                y = placement.y,
                width = placement.width,
                height = placement.height,
                "overlay placed"
            );
            compositor.add_layer(Layer::at_placement(resized, placement, p.opacity));
        }
        compositor.apply(&mut canvas);

        if let Some(cert) = &self.params.certification {
            self.stamp_certification(&mut canvas, canvas_size, &reserved, &mut warnings, cert)?;
        }

        let flat = compositor::flatten(&canvas, Color::white());
        let quality = EncoderQuality::with_quality(self.params.output.quality);
        let encoder = EncoderFactory::create(self.params.output.format);
        let encoded = encoder.encode(flat.as_raw(), canvas_size.0, canvas_size.1, quality)?;

        tracing::info!(
            width = canvas_size.0,
            height = canvas_size.1,
            bytes = encoded.data.len(),
            warnings = warnings.len(),
            "compose finished"
        );

        Ok(ComposedImage {
            data: encoded.data,
            content_type: encoded.content_type,
            file_name: self.params.output.file_name(),
            width: canvas_size.0,
            height: canvas_size.1,
            warnings,
        })
    }

    fn stamp_certification(
        &self,
        canvas: &mut RgbaImage,
        canvas_size: (u32, u32),
        reserved: &[layout::ReservedRegion],
        warnings: &mut Vec<ComposeWarning>,
        cert: &crate::config::CertificationParams,
    ) -> Result<(), ComposeError> {
        if let Some(warning) = self.fonts.fallback_warning(FontStyle::Bold) {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }

        let font = self.fonts.font(FontStyle::Bold);
        let options = TextOptions {
            text: cert.text.clone(),
            font_size: cert.size.resolve(canvas_size.0) as f32,
            color: parse_hex_color(&cert.color)?,
            opacity: 1.0,
        };
        let outline_color = parse_hex_color(&cert.outline_color)?;
        let stamp = render_outlined_text(font, &options, outline_color, cert.outline_radius)?;

        let placement = layout::place(
            canvas_size,
            (stamp.width(), stamp.height()),
            cert.anchor,
            cert.margin,
            reserved,
        );
        compositor::blit(canvas, &stamp, placement.x, placement.y, cert.opacity);
        Ok(())
    }
}

/// Decode image bytes, guessing the format from the data.
fn decode_image(data: &[u8]) -> Result<DynamicImage, ComposeError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ComposeError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ComposeError::decode_failed(e.to_string()))
}

fn load_overlay(source: &OverlaySource, uploads: &[Vec<u8>]) -> Result<RgbaImage, AssetError> {
    let img = match source {
        OverlaySource::File { path } => image::open(path)?,
        OverlaySource::Upload { index } => {
            let bytes = uploads
                .get(*index)
                .ok_or(AssetError::MissingUpload { index: *index })?;
            ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()?
                .decode()?
        }
    };
    Ok(img.to_rgba8())
}

fn source_label(source: &OverlaySource) -> String {
    match source {
        OverlaySource::File { path } => path.clone(),
        OverlaySource::Upload { index } => format!("upload[{}]", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn photo_bytes(w: u32, h: u32) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(w, h, Rgba([90, 120, 150, 255])))
    }

    #[test]
    fn test_decode_image_roundtrip() {
        let bytes = photo_bytes(8, 6);
        let img = decode_image(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
    }

    #[test]
    fn test_decode_invalid_data() {
        assert!(decode_image(&[0, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_load_overlay_from_upload() {
        let uploads = vec![photo_bytes(10, 10)];
        let source = OverlaySource::Upload { index: 0 };
        let img = load_overlay(&source, &uploads).unwrap();
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[test]
    fn test_load_overlay_upload_index_out_of_range() {
        let source = OverlaySource::Upload { index: 3 };
        let err = load_overlay(&source, &[]).unwrap_err();
        assert!(matches!(err, AssetError::MissingUpload { index: 3 }));
    }

    #[test]
    fn test_load_overlay_missing_file() {
        let source = OverlaySource::File {
            path: "/nonexistent/logo.png".to_string(),
        };
        assert!(load_overlay(&source, &[]).is_err());
    }

    #[test]
    fn test_source_label() {
        assert_eq!(
            source_label(&OverlaySource::File {
                path: "a/b.png".to_string()
            }),
            "a/b.png"
        );
        assert_eq!(
            source_label(&OverlaySource::Upload { index: 2 }),
            "upload[2]"
        );
    }
}
