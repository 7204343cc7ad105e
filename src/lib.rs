//! # canvas-fx
//!
//! Media helpers for a photo and video editor: text, watermark and emoji
//! overlays, audio effects for video clips, and neural style transfer with a
//! frozen VGG19 network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canvas_fx::{assets::LocalAssetStore, config::Config, transfer::run_nst};
//!
//! # fn main() -> canvas_fx::Result<()> {
//! let mut config = Config::default();
//! config.transfer.weights_path = Some("vgg19.mpk".into());
//! config.transfer.iterations = 200;
//!
//! let store = LocalAssetStore::from_config(&config.assets);
//! let result = run_nst("photo.jpg", "https://example.com/starry_night.jpg", Some(&store), &config)?;
//! result.image.save("stylized.png").unwrap();
//! for url in &result.snapshot_urls {
//!     println!("{}", url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`transfer`] - Neural style transfer (loader, VGG19, losses, optimizer, reporting)
//! - [`overlay`] - Text, watermark and emoji overlays with loosely-typed parameters
//! - [`audio`] - Decoding, gain effects and WAV output
//! - [`video`] - Remuxing processed audio into clips with FFmpeg
//! - [`assets`] - Resolving image references and publishing snapshots
//! - [`config`] - Configuration management
//!
//! ## Custom Overlays
//!
//! New overlays implement [`Overlay`](overlay::Overlay) and are registered by name:
//!
//! ```rust,no_run
//! use canvas_fx::error::OverlayError;
//! use canvas_fx::overlay::{Overlay, OverlayRegistry, SpecValue};
//! use image::DynamicImage;
//!
//! struct Grayscale;
//!
//! impl Overlay for Grayscale {
//!     fn name(&self) -> &str { "grayscale" }
//!     fn description(&self) -> &str { "Drops color" }
//!     fn arity(&self) -> usize { 0 }
//!     fn apply(&self, image: &DynamicImage, _specs: &[SpecValue]) -> Result<DynamicImage, OverlayError> {
//!         Ok(image.grayscale())
//!     }
//! }
//!
//! let mut registry = OverlayRegistry::default();
//! registry.register("grayscale".to_string(), || Box::new(Grayscale));
//! ```

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod overlay;
pub mod transfer;
pub mod video;

pub use crate::{
    config::Config,
    error::{FxError, Result},
    overlay::{Overlay, OverlayRegistry},
    transfer::{run_nst, StylizedImage},
};
