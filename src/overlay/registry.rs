use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::overlay::spec::{EmojiSpec, SpecValue, TextSpec};
use crate::overlay::text::{draw_text_with, FontResolver};
use crate::overlay::watermark::try_add_emoji_overlay;

/// An overlay that can be driven by a loosely-typed parameter list
pub trait Overlay: Send + Sync {
    /// Unique name of this overlay
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Number of parameters the overlay expects
    fn arity(&self) -> usize;

    /// Apply the overlay to a copy of `image`
    fn apply(&self, image: &DynamicImage, specs: &[SpecValue]) -> std::result::Result<DynamicImage, OverlayError>;
}

/// Text drawn with a resolved font
pub struct TextOverlay {
    fonts: Arc<FontResolver>,
}

impl TextOverlay {
    pub fn new(fonts: Arc<FontResolver>) -> Self {
        Self { fonts }
    }
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self::new(Arc::new(FontResolver::new()))
    }
}

impl Overlay for TextOverlay {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Text at an offset: [text, font, size, [x, y], [r, g, b]]"
    }

    fn arity(&self) -> usize {
        TextSpec::ARITY
    }

    fn apply(&self, image: &DynamicImage, specs: &[SpecValue]) -> std::result::Result<DynamicImage, OverlayError> {
        draw_text_with(&self.fonts, image, specs)
    }
}

/// Emoji PNG from a directory, stamped like a watermark
pub struct EmojiOverlay {
    emoji_dir: PathBuf,
}

impl EmojiOverlay {
    pub fn new<P: Into<PathBuf>>(emoji_dir: P) -> Self {
        Self {
            emoji_dir: emoji_dir.into(),
        }
    }
}

impl Overlay for EmojiOverlay {
    fn name(&self) -> &str {
        "emoji"
    }

    fn description(&self) -> &str {
        "Emoji stamp: [file.png, [x, y], size, opacity]"
    }

    fn arity(&self) -> usize {
        EmojiSpec::ARITY
    }

    fn apply(&self, image: &DynamicImage, specs: &[SpecValue]) -> std::result::Result<DynamicImage, OverlayError> {
        try_add_emoji_overlay(image, specs, &self.emoji_dir)
    }
}

/// Registry of named overlays.
///
/// Overlays are registered by name with a factory and instantiated on lookup.
pub struct OverlayRegistry {
    overlays: HashMap<String, Box<dyn Fn() -> Box<dyn Overlay>>>,
}

impl OverlayRegistry {
    /// Registry with the built-in `text` and `emoji` overlays
    pub fn new(config: &OverlayConfig) -> Self {
        let mut registry = Self {
            overlays: HashMap::new(),
        };

        registry.register_builtin_overlays(config);
        registry
    }

    fn register_builtin_overlays(&mut self, config: &OverlayConfig) {
        let fonts = Arc::new(match &config.fonts_dir {
            Some(dir) => FontResolver::with_fonts_dir(dir),
            None => FontResolver::new(),
        });
        self.overlays.insert(
            "text".to_string(),
            Box::new(move || Box::new(TextOverlay::new(Arc::clone(&fonts)))),
        );

        let emoji_dir = config.emoji_dir.clone();
        self.overlays.insert(
            "emoji".to_string(),
            Box::new(move || Box::new(EmojiOverlay::new(emoji_dir.clone()))),
        );
    }

    /// Register a custom overlay, replacing any overlay of the same name
    pub fn register<F>(&mut self, name: String, factory: F)
    where
        F: Fn() -> Box<dyn Overlay> + 'static,
    {
        self.overlays.insert(name, Box::new(factory));
    }

    pub fn get_overlay(&self, name: &str) -> Option<Box<dyn Overlay>> {
        self.overlays.get(name).map(|factory| factory())
    }

    /// Apply the overlay called `name`
    pub fn apply(&self, name: &str, image: &DynamicImage, specs: &[SpecValue]) -> Result<DynamicImage> {
        let overlay = self.get_overlay(name).ok_or_else(|| OverlayError::NotFound {
            name: name.to_string(),
        })?;

        Ok(overlay.apply(image, specs)?)
    }

    /// Names of all registered overlays, sorted
    pub fn available_overlays(&self) -> Vec<String> {
        let mut names: Vec<String> = self.overlays.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_overlay(&self, name: &str) -> bool {
        self.overlays.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::overlay::spec::parse_specs;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    struct Invert;

    impl Overlay for Invert {
        fn name(&self) -> &str {
            "invert"
        }

        fn description(&self) -> &str {
            "Inverts colors"
        }

        fn arity(&self) -> usize {
            0
        }

        fn apply(&self, image: &DynamicImage, _specs: &[SpecValue]) -> std::result::Result<DynamicImage, OverlayError> {
            let mut output = image.clone();
            output.invert();
            Ok(output)
        }
    }

    #[test]
    fn test_builtin_overlays_available() {
        let registry = OverlayRegistry::default();

        assert!(registry.has_overlay("text"));
        assert!(registry.has_overlay("emoji"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.available_overlays(), vec!["emoji", "text"]);
        assert_eq!(registry.get_overlay("text").unwrap().arity(), 5);
    }

    #[test]
    fn test_unknown_overlay() {
        let registry = OverlayRegistry::default();
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));

        assert!(registry.get_overlay("sparkles").is_none());
        assert!(matches!(
            registry.apply("sparkles", &image, &[]),
            Err(FxError::Overlay(OverlayError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_custom_overlay_registration() {
        let mut registry = OverlayRegistry::default();
        registry.register("invert".to_string(), || Box::new(Invert));

        assert_eq!(registry.len(), 3);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([0, 10, 255])));
        let output = registry.apply("invert", &image, &[]).unwrap();
        assert_eq!(output.to_rgb8().get_pixel(0, 0), &Rgb([255, 245, 0]));
    }

    #[test]
    fn test_emoji_overlay_uses_configured_dir() {
        let dir = tempdir().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]))
            .save(dir.path().join("dot.png"))
            .unwrap();

        let registry = OverlayRegistry::new(&OverlayConfig {
            emoji_dir: dir.path().to_path_buf(),
            ..OverlayConfig::default()
        });
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let specs = parse_specs(r#"["dot.png", [2, 2], 1, 1]"#).unwrap();

        let output = registry.apply("emoji", &image, &specs).unwrap().to_rgb8();
        assert_eq!(output.get_pixel(2, 2), &Rgb([255, 255, 255]));
        assert_eq!(output.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_text_overlay_with_missing_fonts_dir() {
        let registry = OverlayRegistry::new(&OverlayConfig {
            fonts_dir: Some(PathBuf::from("/definitely/not/a/font/dir")),
            ..OverlayConfig::default()
        });
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 32));
        let specs = parse_specs(r#"["ok", "missing.ttf", 14, [1, 1], [255, 255, 255]]"#).unwrap();

        let output = registry.apply("text", &image, &specs).unwrap();
        assert_eq!((output.width(), output.height()), (64, 32));
    }
}
