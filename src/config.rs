//! Compose parameter configuration.
//!
//! Serde-backed parameter structs for one compose run, loadable from YAML.
//! Everything the interactive variants hardcoded (target size, logo paths,
//! band styling) is explicit configuration here. Each struct validates
//! itself before any pixel work; validation failures are fatal.
//!
//! ```yaml
//! target_size: 1600
//! overlays:
//!   - source: {type: file, path: "logos/brand.png"}
//!     scale_pct: 20
//!     anchor: bottom-right
//! band:
//!   height_pct: 12
//!   left: {text: "Summer Sale", bold: true}
//!   right: {text: "ends Sunday", color: "#FFD700"}
//! ```

use serde::{Deserialize, Serialize};

use crate::band::{BandHalf, BandSpec};
use crate::canvas::{CropBox, CropMode};
use crate::encoder::OutputFormat;
use crate::error::ComposeError;
use crate::layout::{Anchor, Edge};
use crate::text::parse_hex_color;

// Default values
fn default_target_size() -> u32 {
    1600
}

fn default_scale_pct() -> f32 {
    20.0
}

fn default_margin() -> u32 {
    10
}

fn default_opacity() -> f32 {
    1.0
}

fn default_overlay_anchor() -> Anchor {
    Anchor::BottomRight
}

fn default_cert_anchor() -> Anchor {
    Anchor::TopRight
}

fn default_band_height_pct() -> f32 {
    12.0
}

fn default_band_edge() -> Edge {
    Edge::Bottom
}

fn default_font_size() -> u32 {
    48
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_top_margin() -> u32 {
    10
}

fn default_text_margin() -> u32 {
    20
}

fn default_outline_radius() -> u32 {
    2
}

fn default_cert_size() -> Dimension {
    Dimension::Pixels(48)
}

fn default_quality() -> u8 {
    85
}

fn default_file_stem() -> String {
    "image_with_text".to_string()
}

/// Size that can be absolute pixels or a percentage of the canvas width.
///
/// Parsed from strings: `"48"` is pixels, `"3%"` or `"3p"` is percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    Pixels(u32),
    Percentage(f32),
}

impl Dimension {
    /// Resolve to pixels against a base dimension.
    pub fn resolve(&self, base: u32) -> u32 {
        match self {
            Dimension::Pixels(px) => *px,
            Dimension::Percentage(pct) => ((base as f32) * pct / 100.0).round() as u32,
        }
    }
}

impl TryFrom<String> for Dimension {
    type Error = ComposeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.ends_with('p') || s.ends_with('%') {
            let pct: f32 = s
                .trim_end_matches(['p', '%'])
                .parse()
                .map_err(|_| ComposeError::invalid_param("size", "invalid percentage"))?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(ComposeError::invalid_param(
                    "size",
                    "percentage must be 0-100",
                ));
            }
            Ok(Dimension::Percentage(pct))
        } else {
            let px: u32 = s
                .parse()
                .map_err(|_| ComposeError::invalid_param("size", "invalid pixel value"))?;
            Ok(Dimension::Pixels(px))
        }
    }
}

impl From<Dimension> for String {
    fn from(d: Dimension) -> Self {
        match d {
            Dimension::Pixels(px) => px.to_string(),
            Dimension::Percentage(pct) => format!("{}%", pct),
        }
    }
}

/// How the uploaded photograph is fitted to the square canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CropParams {
    /// Scale to cover, crop centered
    #[default]
    ResizeAndCenterCrop,
    /// Scale to cover, crop at a manual offset
    ResizeAndManualCrop { offset_x: u32, offset_y: u32 },
    /// Apply a crop box directly, no scaling
    NoResize {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    },
}

impl CropParams {
    pub fn to_crop_mode(&self) -> CropMode {
        match *self {
            CropParams::ResizeAndCenterCrop => CropMode::ResizeCenterCrop,
            CropParams::ResizeAndManualCrop { offset_x, offset_y } => CropMode::ResizeManualCrop {
                offset: (offset_x, offset_y),
            },
            CropParams::NoResize {
                left,
                top,
                right,
                bottom,
            } => CropMode::NoResize {
                crop_box: CropBox {
                    left,
                    top,
                    right,
                    bottom,
                },
            },
        }
    }
}

/// Where an overlay graphic comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlaySource {
    /// A fixed graphic on disk; absence is non-fatal (the overlay is
    /// skipped with a warning)
    File { path: String },
    /// An uploaded graphic, by index into the uploads passed to the
    /// pipeline
    Upload { index: usize },
}

/// One overlay graphic to composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayParams {
    pub source: OverlaySource,

    /// Rendered width as percent of canvas width (slider range 5-50)
    #[serde(default = "default_scale_pct")]
    pub scale_pct: f32,

    #[serde(default = "default_overlay_anchor")]
    pub anchor: Anchor,

    /// Margin from edges and between stacked items, in pixels
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Opacity from 0.0 to 1.0
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Overlays sharing anchor and group stack vertically
    #[serde(default)]
    pub group: u32,
}

impl OverlayParams {
    /// Scale as a fraction of canvas width.
    pub fn scale(&self) -> f32 {
        self.scale_pct / 100.0
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        if !self.scale_pct.is_finite() || self.scale_pct <= 0.0 || self.scale_pct > 100.0 {
            return Err(ComposeError::invalid_param(
                "overlay.scale_pct",
                format!("must be in (0, 100], got {}", self.scale_pct),
            ));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ComposeError::invalid_param(
                "overlay.opacity",
                format!("must be between 0.0 and 1.0, got {}", self.opacity),
            ));
        }
        Ok(())
    }
}

/// Text styling for one band half.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandTextParams {
    #[serde(default)]
    pub text: String,

    /// Font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Text color as hex string
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub bold: bool,

    /// Background fill color as hex string
    #[serde(default = "default_background")]
    pub background: String,

    /// Background opacity from 0.0 to 1.0
    #[serde(default = "default_opacity")]
    pub background_opacity: f32,

    /// Fixed offset of the text origin from the band top, in pixels
    #[serde(default = "default_top_margin")]
    pub top_margin: u32,
}

impl BandTextParams {
    pub fn validate(&self) -> Result<(), ComposeError> {
        parse_hex_color(&self.color)?;
        parse_hex_color(&self.background)?;
        if !self.background_opacity.is_finite() || !(0.0..=1.0).contains(&self.background_opacity)
        {
            return Err(ComposeError::invalid_param(
                "band.background_opacity",
                format!("must be between 0.0 and 1.0, got {}", self.background_opacity),
            ));
        }
        if self.font_size == 0 {
            return Err(ComposeError::invalid_param(
                "band.font_size",
                "must be positive",
            ));
        }
        Ok(())
    }

    fn to_half(&self) -> Result<BandHalf, ComposeError> {
        let color = parse_hex_color(&self.color)?;
        let background = parse_hex_color(&self.background)?
            .with_alpha((self.background_opacity.clamp(0.0, 1.0) * 255.0) as u8);
        Ok(BandHalf {
            text: self.text.clone(),
            font_size: self.font_size as f32,
            color,
            bold: self.bold,
            background,
            top_margin: self.top_margin,
        })
    }
}

impl Default for BandTextParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: default_font_size(),
            color: default_color(),
            bold: false,
            background: default_background(),
            background_opacity: default_opacity(),
            top_margin: default_top_margin(),
        }
    }
}

/// The split text band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandParams {
    #[serde(default = "default_band_edge")]
    pub edge: Edge,

    /// Band height as percent of canvas height (slider range 5-30)
    #[serde(default = "default_band_height_pct")]
    pub height_pct: f32,

    #[serde(default)]
    pub left: BandTextParams,

    #[serde(default)]
    pub right: BandTextParams,

    /// Horizontal inset of each half's text, in pixels
    #[serde(default = "default_text_margin")]
    pub text_margin: u32,
}

impl BandParams {
    pub fn validate(&self) -> Result<(), ComposeError> {
        if !self.height_pct.is_finite() || self.height_pct <= 0.0 || self.height_pct > 100.0 {
            return Err(ComposeError::invalid_param(
                "band.height_pct",
                format!("must be in (0, 100], got {}", self.height_pct),
            ));
        }
        self.left.validate()?;
        self.right.validate()?;
        Ok(())
    }

    pub fn to_spec(&self) -> Result<BandSpec, ComposeError> {
        Ok(BandSpec {
            edge: self.edge,
            height_pct: self.height_pct / 100.0,
            left: self.left.to_half()?,
            right: self.right.to_half()?,
            text_margin: self.text_margin,
        })
    }
}

/// A short outlined text stamp with its own anchor and scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationParams {
    pub text: String,

    /// Font size in pixels, or percent of canvas width (e.g. "3%")
    #[serde(default = "default_cert_size")]
    pub size: Dimension,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_background")]
    pub outline_color: String,

    /// Stroke radius in pixels; 0 disables the outline
    #[serde(default = "default_outline_radius")]
    pub outline_radius: u32,

    #[serde(default = "default_cert_anchor")]
    pub anchor: Anchor,

    #[serde(default = "default_margin")]
    pub margin: u32,

    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl CertificationParams {
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.text.is_empty() {
            return Err(ComposeError::invalid_param(
                "certification.text",
                "must not be empty",
            ));
        }
        parse_hex_color(&self.color)?;
        parse_hex_color(&self.outline_color)?;
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ComposeError::invalid_param(
                "certification.opacity",
                format!("must be between 0.0 and 1.0, got {}", self.opacity),
            ));
        }
        Ok(())
    }
}

/// Output encoding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputParams {
    #[serde(default)]
    pub format: OutputFormat,

    /// Quality 1-100, used by lossy formats
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// File name without extension; the extension follows the format
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl OutputParams {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.format.extension())
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ComposeError::invalid_param(
                "output.quality",
                format!("must be 1-100, got {}", self.quality),
            ));
        }
        if self.file_stem.is_empty() {
            return Err(ComposeError::invalid_param(
                "output.file_stem",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: default_quality(),
            file_stem: default_file_stem(),
        }
    }
}

/// Full parameter set for one compose run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeParams {
    /// Target square canvas size in pixels
    #[serde(default = "default_target_size")]
    pub target_size: u32,

    #[serde(default)]
    pub crop: CropParams,

    #[serde(default)]
    pub overlays: Vec<OverlayParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<BandParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<CertificationParams>,

    #[serde(default)]
    pub output: OutputParams,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            crop: CropParams::default(),
            overlays: Vec::new(),
            band: None,
            certification: None,
            output: OutputParams::default(),
        }
    }
}

impl ComposeParams {
    /// Parse parameters from a YAML document and validate them.
    pub fn from_yaml(yaml: &str) -> Result<Self, ComposeError> {
        let params: ComposeParams = serde_yaml::from_str(yaml)
            .map_err(|e| ComposeError::invalid_param("yaml", e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.target_size == 0 {
            return Err(ComposeError::invalid_param(
                "target_size",
                "must be positive",
            ));
        }
        for overlay in &self.overlays {
            overlay.validate()?;
        }
        if let Some(band) = &self.band {
            band.validate()?;
        }
        if let Some(cert) = &self.certification {
            cert.validate()?;
        }
        self.output.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ComposeParams::default();
        assert_eq!(params.target_size, 1600);
        assert_eq!(params.crop, CropParams::ResizeAndCenterCrop);
        assert!(params.overlays.is_empty());
        assert!(params.band.is_none());
        assert_eq!(params.output.file_name(), "image_with_text.jpg");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_minimal() {
        let params = ComposeParams::from_yaml("{}").unwrap();
        assert_eq!(params.target_size, 1600);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r##"
target_size: 800
crop:
  mode: resize-and-manual-crop
  offset_x: 40
  offset_y: 0
overlays:
  - source: {type: file, path: "logos/brand.png"}
    scale_pct: 25
    anchor: bottom-right
    margin: 16
  - source: {type: upload, index: 0}
    anchor: top-left
band:
  height_pct: 15
  left:
    text: "Summer Sale"
    bold: true
  right:
    text: "ends Sunday"
    color: "#FFD700"
certification:
  text: "CERTIFIED"
  size: "3%"
  anchor: top-right
output:
  format: jpeg
  quality: 90
"##;
        let params = ComposeParams::from_yaml(yaml).unwrap();
        assert_eq!(params.target_size, 800);
        assert_eq!(
            params.crop,
            CropParams::ResizeAndManualCrop {
                offset_x: 40,
                offset_y: 0
            }
        );
        assert_eq!(params.overlays.len(), 2);
        assert_eq!(params.overlays[0].anchor, Anchor::BottomRight);
        assert_eq!(params.overlays[0].scale(), 0.25);
        assert_eq!(params.overlays[1].margin, 10);

        let band = params.band.unwrap();
        assert_eq!(band.height_pct, 15.0);
        assert!(band.left.bold);
        assert_eq!(band.right.color, "#FFD700");

        let cert = params.certification.unwrap();
        assert_eq!(cert.size, Dimension::Percentage(3.0));
        assert_eq!(cert.size.resolve(800), 24);
    }

    #[test]
    fn test_unrecognized_anchor_in_yaml_falls_back() {
        let yaml = r#"
overlays:
  - source: {type: upload, index: 0}
    anchor: somewhere-odd
"#;
        let params = ComposeParams::from_yaml(yaml).unwrap();
        assert_eq!(params.overlays[0].anchor, Anchor::BottomRight);
    }

    #[test]
    fn test_dimension_parsing() {
        assert_eq!(
            Dimension::try_from("48".to_string()).unwrap(),
            Dimension::Pixels(48)
        );
        assert_eq!(
            Dimension::try_from("12%".to_string()).unwrap(),
            Dimension::Percentage(12.0)
        );
        assert_eq!(
            Dimension::try_from("12p".to_string()).unwrap(),
            Dimension::Percentage(12.0)
        );
        assert!(Dimension::try_from("abc".to_string()).is_err());
        assert!(Dimension::try_from("120%".to_string()).is_err());
    }

    #[test]
    fn test_dimension_resolve() {
        assert_eq!(Dimension::Pixels(64).resolve(1600), 64);
        assert_eq!(Dimension::Percentage(50.0).resolve(1600), 800);
    }

    #[test]
    fn test_overlay_scale_out_of_range_rejected() {
        let mut params = ComposeParams::default();
        params.overlays.push(OverlayParams {
            source: OverlaySource::Upload { index: 0 },
            scale_pct: 0.0,
            anchor: Anchor::BottomRight,
            margin: 10,
            opacity: 1.0,
            group: 0,
        });
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_bad_band_color_rejected() {
        let yaml = r#"
band:
  left:
    text: "x"
    color: "FFFFFF"
"#;
        assert!(ComposeParams::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_band_height_out_of_range_rejected() {
        let yaml = "band: {height_pct: 0}";
        assert!(ComposeParams::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let yaml = "output: {quality: 0}";
        assert!(ComposeParams::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_certification_text_rejected() {
        let yaml = "certification: {text: \"\"}";
        assert!(ComposeParams::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_output_file_name_follows_format() {
        let output = OutputParams {
            format: OutputFormat::Png,
            quality: 85,
            file_stem: "image_with_text".to_string(),
        };
        assert_eq!(output.file_name(), "image_with_text.png");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut params = ComposeParams::default();
        params.overlays.push(OverlayParams {
            source: OverlaySource::File {
                path: "logo.png".to_string(),
            },
            scale_pct: 30.0,
            anchor: Anchor::TopLeft,
            margin: 12,
            opacity: 0.8,
            group: 1,
        });
        let yaml = serde_yaml::to_string(&params).unwrap();
        let parsed = ComposeParams::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.overlays[0].anchor, Anchor::TopLeft);
        assert_eq!(parsed.overlays[0].scale_pct, 30.0);
    }
}
