//! # Image Overlays
//!
//! Text, watermark and emoji overlays driven by loosely-typed parameter
//! lists. Every overlay works on a copy of the input image and keeps its
//! dimensions.
//!
//! The plain functions return `None` when a parameter is invalid; the
//! `try_*` variants return the first violated constraint instead.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use canvas_fx::overlay::{add_text_to_image, parse_specs};
//!
//! let image = image::open("photo.jpg").unwrap();
//! let specs = parse_specs(r#"["Hello", "DejaVuSans.ttf", 32, [10, 10], [255, 255, 255]]"#).unwrap();
//! let labelled = add_text_to_image(&image, &specs);
//! ```

pub mod registry;
pub mod spec;
pub mod text;
pub mod watermark;

use std::path::Path;

use image::DynamicImage;

use crate::error::{ImageError, Result};

pub use registry::{EmojiOverlay, Overlay, OverlayRegistry, TextOverlay};
pub use spec::{parse_specs, EmojiSpec, PlacementSpec, SpecValue, TextSpec};
pub use text::{add_text_to_image, try_add_text_to_image, FontResolver};
pub use watermark::{
    add_emoji_overlay, add_watermark_image, scale_image, try_add_emoji_overlay, try_add_watermark_image,
};

/// Save an overlay result; the format follows the file extension
pub fn store_image<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
    image.save(path.as_ref()).map_err(|e| ImageError::EncodeFailed {
        reason: format!("{}: {}", path.as_ref().display(), e),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_store_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([9, 8, 7])));

        store_image(&image, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8(), image.to_rgb8());
    }

    #[test]
    fn test_store_image_unknown_extension() {
        let dir = tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        assert!(store_image(&image, dir.path().join("out.unknown")).is_err());
    }
}
