//! Canvas preparation: resize + deterministic crop.
//!
//! Handles the first pipeline stage: scaling the uploaded photograph so the
//! target square fits, then cropping it with a reproducible rule (centered
//! or caller-supplied offset). Downscaling uses Lanczos3 via
//! `fast_image_resize` for fidelity.
//!
//! All dimension validation happens before any pixel work.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{imageops, DynamicImage, RgbaImage};
use std::num::NonZeroU32;

use crate::error::ComposeError;

/// How the source photograph is fitted to the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Uniform scale so the target square fits, then crop centered
    ResizeCenterCrop,
    /// Uniform scale, then crop at a caller-supplied offset (clamped to
    /// the valid range)
    ResizeManualCrop { offset: (u32, u32) },
    /// No scaling; the crop box is applied directly
    NoResize { crop_box: CropBox },
}

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Prepare the canvas: resize and crop the source image per `mode`.
///
/// For the resize modes the result is exactly `target_size` square. For
/// `NoResize` the result is the (clipped) crop box region.
///
/// # Errors
///
/// `InvalidDimension` if `target_size` is zero, the source has a zero
/// dimension, or a `NoResize` crop box degenerates after clipping.
pub fn prepare(
    image: &DynamicImage,
    target_size: u32,
    mode: &CropMode,
) -> Result<RgbaImage, ComposeError> {
    let src_w = image.width();
    let src_h = image.height();

    if src_w == 0 || src_h == 0 {
        return Err(ComposeError::invalid_dimension(
            src_w,
            src_h,
            "source image has a zero dimension",
        ));
    }
    if target_size == 0 {
        return Err(ComposeError::invalid_dimension(
            target_size,
            target_size,
            "target size must be positive",
        ));
    }

    match mode {
        CropMode::NoResize { crop_box } => crop_direct(image, crop_box),
        CropMode::ResizeCenterCrop => {
            let scaled = scale_to_cover(image, target_size)?;
            let left = (scaled.width() - target_size) / 2;
            let top = (scaled.height() - target_size) / 2;
            Ok(imageops::crop_imm(&scaled, left, top, target_size, target_size).to_image())
        }
        CropMode::ResizeManualCrop { offset } => {
            let scaled = scale_to_cover(image, target_size)?;
            let x = offset.0.min(scaled.width() - target_size);
            let y = offset.1.min(scaled.height() - target_size);
            Ok(imageops::crop_imm(&scaled, x, y, target_size, target_size).to_image())
        }
    }
}

/// Uniform-scale the image so both dimensions cover `target_size`.
///
/// ratio = max(t/w, t/h); scaled dimensions round, then clamp so neither
/// drops below the target. A source already at scale is passed through
/// untouched, which makes centered preparation of an exact-size image the
/// identity.
fn scale_to_cover(image: &DynamicImage, target_size: u32) -> Result<RgbaImage, ComposeError> {
    let src_w = image.width();
    let src_h = image.height();

    let ratio = (target_size as f64 / src_w as f64).max(target_size as f64 / src_h as f64);
    let scaled_w = ((src_w as f64 * ratio).round() as u32).max(target_size);
    let scaled_h = ((src_h as f64 * ratio).round() as u32).max(target_size);

    let rgba = image.to_rgba8();
    if scaled_w == src_w && scaled_h == src_h {
        return Ok(rgba);
    }

    resize_rgba(&rgba, scaled_w, scaled_h)
}

/// Crop without scaling. The box is validated, then clipped to the image
/// bounds; a box that degenerates after clipping is an error.
fn crop_direct(image: &DynamicImage, crop_box: &CropBox) -> Result<RgbaImage, ComposeError> {
    if crop_box.right <= crop_box.left || crop_box.bottom <= crop_box.top {
        return Err(ComposeError::invalid_dimension(
            crop_box.right.saturating_sub(crop_box.left),
            crop_box.bottom.saturating_sub(crop_box.top),
            "crop box must have positive extent",
        ));
    }

    let right = crop_box.right.min(image.width());
    let bottom = crop_box.bottom.min(image.height());

    if crop_box.left >= right || crop_box.top >= bottom {
        return Err(ComposeError::invalid_dimension(
            right.saturating_sub(crop_box.left),
            bottom.saturating_sub(crop_box.top),
            "crop box degenerates after clipping to image bounds",
        ));
    }

    let rgba = image.to_rgba8();
    Ok(imageops::crop_imm(
        &rgba,
        crop_box.left,
        crop_box.top,
        right - crop_box.left,
        bottom - crop_box.top,
    )
    .to_image())
}

/// Resize an RGBA buffer with Lanczos3 convolution.
pub(crate) fn resize_rgba(
    rgba: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, ComposeError> {
    let src_width = NonZeroU32::new(rgba.width())
        .ok_or_else(|| ComposeError::invalid_dimension(0, rgba.height(), "source width is 0"))?;
    let src_height = NonZeroU32::new(rgba.height())
        .ok_or_else(|| ComposeError::invalid_dimension(rgba.width(), 0, "source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| ComposeError::invalid_dimension(0, target_h, "target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| ComposeError::invalid_dimension(target_w, 0, "target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        rgba.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| ComposeError::render_failed(format!("failed to create resize source: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ComposeError::render_failed(format!("resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec()).ok_or_else(|| {
        ComposeError::render_failed("failed to create output image buffer".to_string())
    })
}
