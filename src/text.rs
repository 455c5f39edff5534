//! Text rasterization and font resolution.
//!
//! Renders styled text runs to RGBA images for compositing. Regular and
//! bold faces are resolved from well-known system font paths; a missing
//! face is a degraded-rendering fallback (the embedded default face is
//! used and a warning is surfaced), never an error.
//!
//! # Example
//!
//! ```ignore
//! use imprint::text::{render_text, FontLibrary, FontStyle, TextOptions, Color};
//!
//! let fonts = FontLibrary::load();
//! let options = TextOptions {
//!     text: "CERTIFIED".to_string(),
//!     font_size: 48.0,
//!     color: Color::white(),
//!     opacity: 1.0,
//! };
//! let image = render_text(fonts.font(FontStyle::Bold), &options)?;
//! ```

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

use crate::error::{ComposeError, ComposeWarning};

/// Embedded default face (DejaVu Sans, OFL-compatible license). Used when
/// no system face can be loaded.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

static EMBEDDED_FONT: OnceLock<FontArc> = OnceLock::new();

fn embedded_font() -> FontArc {
    EMBEDDED_FONT
        .get_or_init(|| {
            FontArc::try_from_slice(EMBEDDED_FONT_DATA)
                .expect("Failed to load embedded font - this is a bug")
        })
        .clone()
}

/// System font candidates, probed in order.
const REGULAR_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
];

const BOLD_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

/// Requested face weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    fn candidates(self) -> &'static [&'static str] {
        match self {
            FontStyle::Regular => REGULAR_CANDIDATES,
            FontStyle::Bold => BOLD_CANDIDATES,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FontStyle::Regular => "regular",
            FontStyle::Bold => "bold",
        }
    }
}

/// Resolved regular and bold faces for one compose run.
///
/// Probing happens once at load; lookups are infallible afterwards.
pub struct FontLibrary {
    regular: FontArc,
    bold: FontArc,
    regular_fallback: bool,
    bold_fallback: bool,
}

impl FontLibrary {
    /// Probe system font paths, falling back to the embedded face per
    /// style. Never fails.
    pub fn load() -> Self {
        let (regular, regular_fallback) = Self::resolve(FontStyle::Regular);
        let (bold, bold_fallback) = Self::resolve(FontStyle::Bold);
        Self {
            regular,
            bold,
            regular_fallback,
            bold_fallback,
        }
    }

    fn resolve(style: FontStyle) -> (FontArc, bool) {
        for path in style.candidates() {
            if let Ok(data) = std::fs::read(path) {
                if let Ok(font) = FontArc::try_from_vec(data) {
                    return (font, false);
                }
            }
        }
        tracing::warn!(style = style.label(), "no system font found, using embedded default");
        (embedded_font(), true)
    }

    pub fn font(&self, style: FontStyle) -> &FontArc {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
        }
    }

    /// The warning to surface if this style resolved to the embedded
    /// default instead of a system face.
    pub fn fallback_warning(&self, style: FontStyle) -> Option<ComposeWarning> {
        let fell_back = match style {
            FontStyle::Regular => self.regular_fallback,
            FontStyle::Bold => self.bold_fallback,
        };
        fell_back.then(|| ComposeWarning::FontFallback {
            requested: style.label().to_string(),
        })
    }
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::load()
    }
}

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Pair with an alpha channel for background fills.
    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
pub fn parse_hex_color(hex: &str) -> Result<Color, ComposeError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| ComposeError::invalid_param("color", "color must start with '#'"))?;

    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| ComposeError::invalid_param("color", "invalid hex digit"))
    };

    match digits.len() {
        3 => {
            // #RGB: each digit doubles, 0xF -> 0xFF
            let r = component(0..1)?;
            let g = component(1..2)?;
            let b = component(2..3)?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = component(0..2)?;
            let g = component(2..4)?;
            let b = component(4..6)?;
            Ok(Color::new(r, g, b))
        }
        len => Err(ComposeError::invalid_param(
            "color",
            format!("color must be #RGB or #RRGGBB, got {} digits", len),
        )),
    }
}

/// Options for rendering one text run.
#[derive(Debug, Clone)]
pub struct TextOptions {
    pub text: String,
    /// Font size in pixels
    pub font_size: f32,
    pub color: Color,
    /// 0.0 to 1.0, multiplied into the glyph coverage
    pub opacity: f32,
}

/// Calculate the pixel dimensions of a rendered text run, including
/// kerning.
pub fn measure_text(font: &FontArc, text: &str, font_size: f32) -> (u32, u32) {
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let height = scaled_font.height();

    let padding = 2;
    (width.ceil() as u32 + padding, height.ceil() as u32 + padding)
}

/// Render a text run to a tight transparent RGBA image.
pub fn render_text(font: &FontArc, options: &TextOptions) -> Result<RgbaImage, ComposeError> {
    if options.text.is_empty() {
        return Err(ComposeError::render_failed("cannot render empty text"));
    }

    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let (width, height) = measure_text(font, &options.text, options.font_size);
    let mut image = RgbaImage::new(width.max(1), height.max(1));

    let alpha = (options.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    let baseline_y = scaled_font.ascent();

    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in options.text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
                    let pixel_alpha = (coverage * alpha as f32) as u8;
                    let pixel = Rgba([
                        options.color.r,
                        options.color.g,
                        options.color.b,
                        pixel_alpha,
                    ]);
                    // Blend with any prior coverage for anti-aliasing
                    let existing = image.get_pixel(x as u32, y as u32);
                    let blended = crate::compositor::blend_pixels(*existing, pixel, 1.0);
                    image.put_pixel(x as u32, y as u32, blended);
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(image)
}

/// Render a text run with a stroke outline.
///
/// The run is stamped at every offset within the outline radius in the
/// outline color, then the fill run is drawn on top. Cheap stroke effect,
/// no vector outlining.
pub fn render_outlined_text(
    font: &FontArc,
    options: &TextOptions,
    outline_color: Color,
    outline_radius: u32,
) -> Result<RgbaImage, ComposeError> {
    let fill = render_text(font, options)?;
    if outline_radius == 0 {
        return Ok(fill);
    }

    let outline_run = render_text(
        font,
        &TextOptions {
            color: outline_color,
            ..options.clone()
        },
    )?;

    let r = outline_radius;
    let mut image = RgbaImage::new(fill.width() + 2 * r, fill.height() + 2 * r);

    for dy in -(r as i32)..=(r as i32) {
        for dx in -(r as i32)..=(r as i32) {
            if dx == 0 && dy == 0 {
                continue;
            }
            crate::compositor::blit(&mut image, &outline_run, r as i32 + dx, r as i32 + dy, 1.0);
        }
    }
    crate::compositor::blit(&mut image, &fill, r as i32, r as i32, 1.0);

    Ok(image)
}
