//! Alpha compositing of positioned layers onto the canvas.
//!
//! Layers are painted in the order they were added; z-order is always
//! caller-controlled, never reordered inside the engine. Blending is the
//! Porter-Duff "over" operator using the layer's own alpha channel as the
//! blend mask, with an optional per-layer opacity multiplier. Layers are
//! clipped at the canvas edges.

use image::{Rgba, RgbaImage};

use crate::layout::Placement;
use crate::text::Color;

/// A positioned raster layer awaiting compositing.
#[derive(Clone)]
pub struct Layer {
    /// The layer image (RGBA)
    pub image: RgbaImage,
    /// Top-left pixel coordinate; may be negative (clipped)
    pub x: i32,
    pub y: i32,
    /// Opacity multiplier (0.0 to 1.0) applied on top of the image's own
    /// alpha channel
    pub opacity: f32,
}

impl Layer {
    /// Build a layer from a layout placement.
    pub fn at_placement(image: RgbaImage, placement: &Placement, opacity: f32) -> Self {
        Self {
            image,
            x: placement.x,
            y: placement.y,
            opacity,
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &(self.x, self.y))
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Compositor that paints layers onto a target canvas in insertion order.
#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<Layer>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Paint all layers onto the target. Layers are applied in the order
    /// they were added.
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            blit(target, &layer.image, layer.x, layer.y, layer.opacity);
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

/// Blend a single RGBA image onto the target at (x, y), clipping at the
/// target bounds.
pub fn blit(target: &mut RgbaImage, source: &RgbaImage, x: i32, y: i32, opacity: f32) {
    let target_w = target.width() as i32;
    let target_h = target.height() as i32;
    let src_w = source.width() as i32;
    let src_h = source.height() as i32;

    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + src_w).min(target_w);
    let y_end = (y + src_h).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let sx = (tx - x) as u32;
            let sy = (ty - y) as u32;

            let src_pixel = source.get_pixel(sx, sy);
            let dst_pixel = target.get_pixel(tx as u32, ty as u32);

            let blended = blend_pixels(*dst_pixel, *src_pixel, opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels with the "over" operator and an extra opacity
/// multiplier on the foreground:
/// `result = fg + bg * (1 - fg.alpha)`.
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0) as u8,
    ])
}

/// Fill a rectangle with an RGBA color, alpha-blending onto the existing
/// pixels. Coordinates are clipped at the canvas bounds.
pub fn fill_rect(
    target: &mut RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    color: Rgba<u8>,
) {
    let x_end = (x + width).min(target.width());
    let y_end = (y + height).min(target.height());

    for ty in y.min(target.height())..y_end {
        for tx in x.min(target.width())..x_end {
            let dst = target.get_pixel(tx, ty);
            let blended = blend_pixels(*dst, color, 1.0);
            target.put_pixel(tx, ty, blended);
        }
    }
}

/// Flatten the canvas to an opaque buffer by compositing onto a solid
/// background. Required before lossy encoding; any residual transparency
/// is resolved here and the alpha channel becomes uniformly opaque.
pub fn flatten(canvas: &RgbaImage, background: Color) -> RgbaImage {
    let mut out = RgbaImage::new(canvas.width(), canvas.height());
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0;
        let over = |fg: u8, bg: u8| -> u8 {
            (fg as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8
        };
        out.put_pixel(
            x,
            y,
            Rgba([
                over(pixel[0], background.r),
                over(pixel[1], background.g),
                over(pixel[2], background.b),
                255,
            ]),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(width, height, color)
    }

    #[test]
    fn test_blit_opaque_replaces_pixels() {
        let mut target = solid(100, 100, Rgba([255, 255, 255, 255]));
        let overlay = solid(20, 20, Rgba([0, 0, 255, 255]));

        blit(&mut target, &overlay, 40, 40, 1.0);

        assert_eq!(target.get_pixel(50, 50), &Rgba([0, 0, 255, 255]));
        assert_eq!(target.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_blit_semi_transparent_blends() {
        let mut target = solid(100, 100, Rgba([255, 255, 255, 255]));
        let overlay = solid(20, 20, Rgba([255, 0, 0, 128]));

        blit(&mut target, &overlay, 0, 0, 1.0);

        let pixel = target.get_pixel(10, 10);
        assert!(pixel[0] > 200);
        assert!(pixel[1] > 100);
        assert!(pixel[2] > 100);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_blit_transparent_pixels_leave_background() {
        let mut target = solid(100, 100, Rgba([255, 0, 0, 255]));
        let overlay = solid(20, 20, Rgba([0, 255, 0, 0]));

        blit(&mut target, &overlay, 40, 40, 1.0);

        assert_eq!(target.get_pixel(50, 50), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_blit_clips_at_edges() {
        let mut target = solid(50, 50, Rgba([255, 255, 255, 255]));
        let overlay = solid(30, 30, Rgba([255, 0, 0, 255]));

        blit(&mut target, &overlay, 40, 40, 1.0);

        assert_eq!(target.get_pixel(45, 45), &Rgba([255, 0, 0, 255]));
        assert_eq!(target.get_pixel(30, 30), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_blit_negative_position_clips() {
        let mut target = solid(50, 50, Rgba([255, 255, 255, 255]));
        let overlay = solid(30, 30, Rgba([255, 0, 0, 255]));

        blit(&mut target, &overlay, -20, -20, 1.0);

        assert_eq!(target.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(target.get_pixel(20, 20), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_opacity_multiplier() {
        let mut target = solid(10, 10, Rgba([0, 0, 0, 255]));
        let overlay = solid(10, 10, Rgba([255, 255, 255, 255]));

        blit(&mut target, &overlay, 0, 0, 0.5);

        let pixel = target.get_pixel(5, 5);
        assert!(pixel[0] > 100 && pixel[0] < 160);
    }

    #[test]
    fn test_zero_opacity_is_noop() {
        let mut target = solid(10, 10, Rgba([255, 255, 255, 255]));
        let before = target.clone();
        let overlay = solid(10, 10, Rgba([255, 0, 0, 255]));

        blit(&mut target, &overlay, 0, 0, 0.0);

        assert_eq!(target, before);
    }

    #[test]
    fn test_compositor_paints_in_insertion_order() {
        let mut target = solid(20, 20, Rgba([255, 255, 255, 255]));

        let mut compositor = Compositor::new();
        compositor.add_layer(Layer {
            image: solid(20, 20, Rgba([255, 0, 0, 255])),
            x: 0,
            y: 0,
            opacity: 1.0,
        });
        compositor.add_layer(Layer {
            image: solid(10, 10, Rgba([0, 0, 255, 255])),
            x: 0,
            y: 0,
            opacity: 1.0,
        });
        compositor.apply(&mut target);

        // Later layer wins where they overlap
        assert_eq!(target.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(target.get_pixel(15, 15), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_compositor_no_layers_is_noop() {
        let mut target = solid(20, 20, Rgba([77, 88, 99, 255]));
        let before = target.clone();

        Compositor::new().apply(&mut target);

        assert_eq!(target, before);
    }

    #[test]
    fn test_compositor_layer_management() {
        let mut compositor = Compositor::new();
        assert_eq!(compositor.layer_count(), 0);

        compositor.add_layer(Layer {
            image: solid(5, 5, Rgba([0, 0, 0, 255])),
            x: 0,
            y: 0,
            opacity: 1.0,
        });
        assert_eq!(compositor.layer_count(), 1);

        compositor.clear();
        assert_eq!(compositor.layer_count(), 0);
    }

    #[test]
    fn test_fill_rect_blends_alpha() {
        let mut target = solid(40, 40, Rgba([255, 255, 255, 255]));
        fill_rect(&mut target, 0, 20, 40, 20, Rgba([0, 0, 0, 128]));

        // Upper half untouched, lower half darkened
        assert_eq!(target.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
        let lower = target.get_pixel(10, 30);
        assert!(lower[0] < 160 && lower[0] > 100);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut target = solid(10, 10, Rgba([0, 0, 0, 255]));
        fill_rect(&mut target, 5, 5, 100, 100, Rgba([255, 255, 255, 255]));
        assert_eq!(target.get_pixel(9, 9), &Rgba([255, 255, 255, 255]));
        assert_eq!(target.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_flatten_opaque_canvas_keeps_colors() {
        let canvas = solid(4, 4, Rgba([12, 34, 56, 255]));
        let flat = flatten(&canvas, Color::white());
        assert_eq!(flat.get_pixel(0, 0), &Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn test_flatten_blends_transparency_onto_background() {
        let canvas = solid(4, 4, Rgba([0, 0, 0, 0]));
        let flat = flatten(&canvas, Color::white());
        assert_eq!(flat.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));

        let half = solid(4, 4, Rgba([0, 0, 0, 128]));
        let flat = flatten(&half, Color::white());
        let p = flat.get_pixel(0, 0);
        assert!(p[0] > 100 && p[0] < 160);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_blend_pixels_direct() {
        let bg = Rgba([0, 0, 0, 255]);
        let fg = Rgba([255, 255, 255, 128]);
        let result = blend_pixels(bg, fg, 1.0);

        assert!(result[0] > 100 && result[0] < 160);
        assert_eq!(result[3], 255);
    }
}
