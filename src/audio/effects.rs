use rayon::prelude::*;
use tracing::debug;

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Gain changes applied to a clip's audio track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioEffect {
    /// Multiply every sample by a factor
    Volume(f32),
    /// Scale so the loudest sample reaches full scale
    Normalize,
    /// Linear fade in and out, durations in seconds; zero disables a side
    Fade { fade_in: f64, fade_out: f64 },
}

impl AudioEffect {
    pub fn validate(&self) -> Result<()> {
        match *self {
            AudioEffect::Volume(factor) if !(factor.is_finite() && factor >= 0.0) => {
                Err(AudioError::InvalidParameters {
                    details: format!("volume factor must be a finite number >= 0, got {}", factor),
                }
                .into())
            }
            AudioEffect::Fade { fade_in, fade_out }
                if !(fade_in.is_finite() && fade_in >= 0.0 && fade_out.is_finite() && fade_out >= 0.0) =>
            {
                Err(AudioError::InvalidParameters {
                    details: format!(
                        "fade durations must be finite and >= 0, got in={} out={}",
                        fade_in, fade_out
                    ),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioEffect::Volume(_) => "volume",
            AudioEffect::Normalize => "normalize",
            AudioEffect::Fade { .. } => "fade",
        }
    }
}

/// Fade gain at time `t` of a clip lasting `total` seconds
pub fn fade_gain(t: f64, total: f64, fade_in: f64, fade_out: f64) -> f32 {
    let gain_in = if fade_in > 0.0 { (t / fade_in).min(1.0) } else { 1.0 };
    let gain_out = if fade_out > 0.0 { ((total - t) / fade_out).min(1.0) } else { 1.0 };
    (gain_in * gain_out).max(0.0) as f32
}

/// Applies [`AudioEffect`]s on a dedicated thread pool
pub struct EffectProcessor {
    pool: rayon::ThreadPool,
}

impl EffectProcessor {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .map_err(|e| AudioError::InvalidParameters {
                details: format!("failed to build thread pool: {}", e),
            })?;

        Ok(Self { pool })
    }

    /// Apply `effect` to `audio` in place
    pub fn apply(&self, effect: AudioEffect, audio: &mut AudioData) -> Result<()> {
        effect.validate()?;
        debug!("Applying {} to {:?}", effect.name(), audio.file_path);

        match effect {
            AudioEffect::Volume(factor) => self.scale(audio, factor),
            AudioEffect::Normalize => {
                let peak = audio.peak();
                if peak > 0.0 {
                    self.scale(audio, 1.0 / peak);
                } else {
                    debug!("Silent audio, nothing to normalize");
                }
            }
            AudioEffect::Fade { fade_in, fade_out } => self.fade(audio, fade_in, fade_out),
        }

        Ok(())
    }

    fn scale(&self, audio: &mut AudioData, factor: f32) {
        self.pool
            .install(|| audio.samples.par_iter_mut().for_each(|sample| *sample *= factor));
    }

    fn fade(&self, audio: &mut AudioData, fade_in: f64, fade_out: f64) {
        let channels = audio.channels.max(1) as usize;
        let sample_rate = audio.sample_rate.max(1) as f64;
        let total = audio.frames() as f64 / sample_rate;

        self.pool.install(|| {
            audio
                .samples
                .par_chunks_mut(channels)
                .enumerate()
                .for_each(|(frame, samples)| {
                    let gain = fade_gain(frame as f64 / sample_rate, total, fade_in, fade_out);
                    samples.iter_mut().for_each(|sample| *sample *= gain);
                })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::AudioFormat;

    fn audio(samples: Vec<f32>, sample_rate: u32, channels: u16) -> AudioData {
        AudioData::new(samples, sample_rate, channels, "clip.mp4", AudioFormat::default())
    }

    fn processor() -> EffectProcessor {
        EffectProcessor::new(2).unwrap()
    }

    #[test]
    fn test_volume_scales_samples() {
        let mut data = audio(vec![0.5, -0.25, 0.1], 10, 1);
        processor().apply(AudioEffect::Volume(2.0), &mut data).unwrap();
        assert_eq!(data.samples, vec![1.0, -0.5, 0.2]);
    }

    #[test]
    fn test_normalize_peaks_at_one() {
        let mut data = audio(vec![0.25, -0.5, 0.125], 10, 1);
        processor().apply(AudioEffect::Normalize, &mut data).unwrap();
        assert_eq!(data.peak(), 1.0);
        assert_eq!(data.samples, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_normalize_leaves_silence() {
        let mut data = audio(vec![0.0; 8], 10, 2);
        processor().apply(AudioEffect::Normalize, &mut data).unwrap();
        assert_eq!(data.samples, vec![0.0; 8]);
    }

    #[test]
    fn test_fade_endpoints() {
        // 2 seconds of stereo at 10 Hz
        let mut data = audio(vec![1.0; 40], 10, 2);
        let fade = AudioEffect::Fade {
            fade_in: 0.5,
            fade_out: 0.5,
        };
        processor().apply(fade, &mut data).unwrap();

        // First frame silent, both channels equal
        assert_eq!(&data.samples[0..2], &[0.0, 0.0]);
        // Frame 1 at t=0.1 -> 0.2
        assert!((data.samples[2] - 0.2).abs() < 1e-6);
        // Middle untouched
        assert_eq!(data.samples[20], 1.0);
        // Last frame at t=1.9 -> (2.0 - 1.9) / 0.5
        assert!((data.samples[39] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_fade_is_a_noop() {
        let mut data = audio(vec![0.7; 10], 10, 1);
        let fade = AudioEffect::Fade {
            fade_in: 0.0,
            fade_out: 0.0,
        };
        processor().apply(fade, &mut data).unwrap();
        assert_eq!(data.samples, vec![0.7; 10]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(AudioEffect::Volume(-1.0).validate().is_err());
        assert!(AudioEffect::Volume(f32::INFINITY).validate().is_err());
        assert!(AudioEffect::Fade { fade_in: -1.0, fade_out: 0.0 }.validate().is_err());
        assert!(AudioEffect::Volume(0.0).validate().is_ok());

        let mut data = audio(vec![0.5], 10, 1);
        assert!(processor().apply(AudioEffect::Volume(f32::NAN), &mut data).is_err());
        assert_eq!(data.samples, vec![0.5]);
    }

    #[test]
    fn test_fade_gain() {
        assert_eq!(fade_gain(0.0, 10.0, 2.0, 2.0), 0.0);
        assert_eq!(fade_gain(1.0, 10.0, 2.0, 2.0), 0.5);
        assert_eq!(fade_gain(5.0, 10.0, 2.0, 2.0), 1.0);
        assert_eq!(fade_gain(9.0, 10.0, 2.0, 2.0), 0.5);
    }
}
