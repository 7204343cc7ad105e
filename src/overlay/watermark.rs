use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::error::OverlayError;
use crate::overlay::spec::{EmojiSpec, PlacementSpec, SpecValue};

/// Scale both sides by `factor`, keeping at least one pixel
pub fn scale_image(image: &DynamicImage, factor: f64) -> DynamicImage {
    let (width, height) = image.dimensions();
    let scaled = |side: u32| ((side as f64 * factor) as u32).max(1);
    image.resize_exact(scaled(width), scaled(height), FilterType::Lanczos3)
}

/// Stamp `watermark` onto a copy of `base`; `None` when the parameters are
/// invalid.
///
/// `specs` is `[[x, y], size, opacity]`. The watermark is scaled by `size`
/// and its own brightness times `opacity` is used as the blend mask, so dark
/// areas of the watermark stay transparent.
pub fn add_watermark_image(
    base: &DynamicImage,
    watermark: &DynamicImage,
    specs: &[SpecValue],
) -> Option<DynamicImage> {
    try_add_watermark_image(base, watermark, specs)
        .map_err(|e| warn!("Watermark rejected: {}", e))
        .ok()
}

pub fn try_add_watermark_image(
    base: &DynamicImage,
    watermark: &DynamicImage,
    specs: &[SpecValue],
) -> Result<DynamicImage, OverlayError> {
    let placement = PlacementSpec::from_values(specs)?;
    Ok(stamp(base, watermark, &placement))
}

/// Stamp an emoji from `emoji_dir` onto a copy of `base`; `None` when the
/// parameters are invalid or the emoji does not exist.
///
/// `specs` is `[file, [x, y], size, opacity]` with `file` ending in `.png`.
pub fn add_emoji_overlay(base: &DynamicImage, specs: &[SpecValue], emoji_dir: &Path) -> Option<DynamicImage> {
    try_add_emoji_overlay(base, specs, emoji_dir)
        .map_err(|e| warn!("Emoji overlay rejected: {}", e))
        .ok()
}

pub fn try_add_emoji_overlay(
    base: &DynamicImage,
    specs: &[SpecValue],
    emoji_dir: &Path,
) -> Result<DynamicImage, OverlayError> {
    let file = EmojiSpec::file_from_values(specs)?;
    let path = emoji_dir.join(&file);
    if !path.is_file() {
        return Err(OverlayError::EmojiNotFound {
            path: path.display().to_string(),
        });
    }

    let emoji = image::open(&path).map_err(|e| OverlayError::ImageUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    debug!("Loaded emoji {:?} ({}x{})", path, emoji.width(), emoji.height());

    let placement = EmojiSpec::placement(specs)?;
    Ok(stamp(base, &emoji, &placement))
}

/// ITU-R 601-2 luma in 16-bit fixed point, rounded
fn mask_luma([r, g, b]: [u8; 3]) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

fn stamp(base: &DynamicImage, watermark: &DynamicImage, placement: &PlacementSpec) -> DynamicImage {
    let scaled = scale_image(watermark, placement.size);
    let colors = scaled.to_rgb8();

    let mut canvas: RgbaImage = base.to_rgba8();
    let (base_width, base_height) = canvas.dimensions();
    let (x0, y0) = placement.position;

    for (x, y, color) in colors.enumerate_pixels() {
        let target_x = x0 as i64 + x as i64;
        let target_y = y0 as i64 + y as i64;
        if target_x < 0 || target_y < 0 || target_x >= base_width as i64 || target_y >= base_height as i64 {
            continue;
        }

        let alpha = (mask_luma(color.0) as f64 * placement.opacity) as u32;
        if alpha == 0 {
            continue;
        }

        let target = canvas.get_pixel_mut(target_x as u32, target_y as u32);
        let Rgba([r, g, b, a]) = *target;
        let blend = |under: u8, over: u8| ((over as u32 * alpha + under as u32 * (255 - alpha) + 127) / 255) as u8;
        *target = Rgba([blend(r, color[0]), blend(g, color[1]), blend(b, color[2]), a]);
    }

    if base.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8())
    }
}
