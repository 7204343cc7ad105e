//! # Video Clips
//!
//! Audio effects for video clips. The soundtrack is decoded and processed in
//! Rust; the external FFmpeg binary puts it back next to the untouched video
//! stream.

pub mod clip;

pub use clip::{ClipAudioEditor, VideoClip};
