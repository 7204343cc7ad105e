use std::path::Path;

use tracing::debug;

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Encodes audio to disk
pub struct AudioWriter;

impl AudioWriter {
    /// Write 32-bit float WAV
    pub fn write_wav<P: AsRef<Path>>(audio: &AudioData, path: P) -> Result<()> {
        let path = path.as_ref();
        let write_failed = |e: hound::Error| AudioError::WriteFailed {
            reason: format!("{}: {}", path.display(), e),
        };

        if audio.channels == 0 || audio.sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "cannot write {} channels at {} Hz",
                    audio.channels, audio.sample_rate
                ),
            }
            .into());
        }

        let spec = hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(write_failed)?;
        for &sample in &audio.samples {
            writer.write_sample(sample).map_err(write_failed)?;
        }
        writer.finalize().map_err(write_failed)?;

        debug!("Wrote {} frames to {:?}", audio.frames(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, AudioLoader};
    use tempfile::tempdir;

    #[test]
    fn test_written_wav_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fx.wav");
        let audio = AudioData::new(vec![0.25, -0.75, 1.0, 0.0], 22050, 2, "clip.mp4", AudioFormat::default());

        AudioWriter::write_wav(&audio, &path).unwrap();
        let loaded = AudioLoader::load(&path).unwrap();

        assert_eq!(loaded.samples, audio.samples);
        assert_eq!(loaded.channels, 2);
        assert_eq!(loaded.sample_rate, 22050);
        assert_eq!(loaded.format.bit_depth, Some(32));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let dir = tempdir().unwrap();
        let audio = AudioData::new(vec![], 44100, 0, "x", AudioFormat::default());
        assert!(AudioWriter::write_wav(&audio, dir.path().join("x.wav")).is_err());
    }
}
