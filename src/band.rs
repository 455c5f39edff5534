//! Edge-docked split text band.
//!
//! A band is a horizontal strip flush against the top or bottom canvas
//! edge, split at the midpoint into two independently styled halves. Each
//! half carries its own text, font size, color, bold flag, and background
//! fill. The band reports its footprint as a reserved region so overlays
//! anchored to the same edge stack inward instead of overlapping it.
//!
//! Text sits at a fixed offset from the band top rather than being
//! vertically centered; text taller than the band overflows unclipped and
//! only surfaces a warning.

use image::{Rgba, RgbaImage};

use crate::compositor::{blit, fill_rect};
use crate::error::{ComposeError, ComposeWarning};
use crate::layout::{Edge, ReservedRegion};
use crate::text::{measure_text, render_text, Color, FontLibrary, FontStyle, TextOptions};

/// One half of a band.
#[derive(Debug, Clone)]
pub struct BandHalf {
    /// Text to draw; empty leaves the half as a plain colored strip
    pub text: String,
    /// Font size in pixels
    pub font_size: f32,
    pub color: Color,
    pub bold: bool,
    /// Background fill, alpha-blended over the canvas
    pub background: Rgba<u8>,
    /// Fixed offset of the text origin from the band top
    pub top_margin: u32,
}

/// A split band docked to a canvas edge.
#[derive(Debug, Clone)]
pub struct BandSpec {
    pub edge: Edge,
    /// Fraction of canvas height, 0 < pct <= 1
    pub height_pct: f32,
    pub left: BandHalf,
    pub right: BandHalf,
    /// Horizontal inset of each half's text from its half's left edge
    pub text_margin: u32,
}

/// Paint the band onto the canvas and return its reserved footprint.
///
/// The reserved region always spans the full canvas width; its height is
/// `floor(canvas_height * height_pct)` and never exceeds the canvas.
pub fn render(
    canvas: &mut RgbaImage,
    spec: &BandSpec,
    fonts: &FontLibrary,
) -> Result<(ReservedRegion, Vec<ComposeWarning>), ComposeError> {
    let canvas_w = canvas.width();
    let canvas_h = canvas.height();

    if !(spec.height_pct > 0.0 && spec.height_pct <= 1.0) {
        return Err(ComposeError::invalid_param(
            "band.height_pct",
            format!("must be in (0, 1], got {}", spec.height_pct),
        ));
    }

    let band_h = ((canvas_h as f64 * spec.height_pct as f64).floor() as u32).min(canvas_h);
    if band_h == 0 {
        return Err(ComposeError::invalid_dimension(
            canvas_w,
            band_h,
            "band height rounds to zero pixels",
        ));
    }

    let band_top = match spec.edge {
        Edge::Bottom => canvas_h - band_h,
        Edge::Top => 0,
    };

    let half_w = canvas_w / 2;
    fill_rect(canvas, 0, band_top, half_w, band_h, spec.left.background);
    fill_rect(
        canvas,
        half_w,
        band_top,
        canvas_w - half_w,
        band_h,
        spec.right.background,
    );

    let mut warnings = Vec::new();
    let halves = [
        (&spec.left, 0u32, "band left half"),
        (&spec.right, half_w, "band right half"),
    ];

    for (half, x_base, region) in halves {
        if half.text.is_empty() {
            continue;
        }

        let style = if half.bold {
            FontStyle::Bold
        } else {
            FontStyle::Regular
        };
        if let Some(warning) = fonts.fallback_warning(style) {
            if !warnings.contains(&warning) {
                warnings.push(warning.clone());
                tracing::warn!(%warning, "band text degraded");
            }
        }

        let font = fonts.font(style);
        let (_, text_h) = measure_text(font, &half.text, half.font_size);
        if text_h + half.top_margin > band_h {
            let warning = ComposeWarning::TextOverflow {
                region: region.to_string(),
                text_height: text_h + half.top_margin,
                region_height: band_h,
            };
            tracing::warn!(%warning, "band text overflows");
            warnings.push(warning);
        }

        let rendered = render_text(
            font,
            &TextOptions {
                text: half.text.clone(),
                font_size: half.font_size,
                color: half.color,
                opacity: 1.0,
            },
        )?;

        let x = (x_base + spec.text_margin) as i32;
        let y = (band_top + half.top_margin) as i32;
        blit(canvas, &rendered, x, y, 1.0);
    }

    let reserved = ReservedRegion {
        x: 0,
        y: band_top,
        width: canvas_w,
        height: band_h,
        edge: spec.edge,
    };

    Ok((reserved, warnings))
}
