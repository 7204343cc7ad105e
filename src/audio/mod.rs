//! # Clip Audio
//!
//! Decodes the audio track of sound files and video clips, applies gain
//! effects (volume, peak normalization, fades) and writes the result as WAV
//! so it can be muxed back into the clip.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use canvas_fx::audio::{AudioEffect, AudioLoader, AudioWriter, EffectProcessor};
//!
//! # fn main() -> canvas_fx::Result<()> {
//! let mut audio = AudioLoader::load("clip.mp4")?;
//! EffectProcessor::new(4)?.apply(AudioEffect::Fade { fade_in: 2.0, fade_out: 2.0 }, &mut audio)?;
//! AudioWriter::write_wav(&audio, "clip_fx.wav")?;
//! # Ok(())
//! # }
//! ```

pub mod effects;
pub mod loader;
pub mod types;
pub mod writer;

pub use effects::{fade_gain, AudioEffect, EffectProcessor};
pub use loader::AudioLoader;
pub use types::{AudioData, AudioFormat};
pub use writer::AudioWriter;
