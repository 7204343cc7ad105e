use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::{AudioData, AudioFormat};
use crate::error::{AudioError, Result};

/// Containers whose audio track is decoded with symphonia
const SYMPHONIA_EXTENSIONS: [&str; 9] = ["mp3", "flac", "ogg", "m4a", "aac", "mp4", "mov", "mkv", "webm"];

/// Decodes the audio of sound files and video clips
pub struct AudioLoader;

impl AudioLoader {
    /// Load the first audio track of a file as interleaved f32 samples
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioData> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        match extension.as_str() {
            "wav" => Self::load_wav(path),
            ext if SYMPHONIA_EXTENSIONS.contains(&ext) => Self::load_with_symphonia(path, ext),
            _ => Err(AudioError::UnsupportedFormat { format: extension }.into()),
        }
    }

    /// WAV through hound
    fn load_wav(path: &Path) -> Result<AudioData> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string(),
        };

        let reader = hound::WavReader::open(path).map_err(|_| load_failed())?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| load_failed())?,
            hound::SampleFormat::Int => reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| Self::int_to_float(s, spec.bits_per_sample)))
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| load_failed())?,
        };

        Ok(AudioData::new(
            samples,
            spec.sample_rate,
            spec.channels,
            path,
            AudioFormat {
                extension: "wav".to_string(),
                bit_depth: Some(spec.bits_per_sample),
                codec: None,
            },
        ))
    }

    /// Everything else through symphonia
    fn load_with_symphonia(path: &Path, extension: &str) -> Result<AudioData> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string(),
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension);

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;
        let mut format = probed.format;

        // Video containers list their video track first
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
            .ok_or_else(|| AudioError::NoAudioTrack {
                path: path.display().to_string(),
            })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params.sample_rate.ok_or_else(|| AudioError::InvalidParameters {
            details: "No sample rate found".to_string(),
        })?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|_| AudioError::UnsupportedFormat {
                format: format!("{:?}", codec_params.codec),
            })?;

        let mut samples = Vec::new();
        let mut channels = codec_params.channels.map(|c| c.count() as u16);
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    warn!("Stopping decode of {:?}: {}", path, e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    warn!("Stopping decode of {:?}: {}", path, e);
                    break;
                }
            };

            let spec = *decoded.spec();
            channels.get_or_insert(spec.channels.count() as u16);

            let needed = decoded.capacity();
            if buffer.as_ref().map_or(true, |buf| buf.capacity() < needed * spec.channels.count()) {
                buffer = Some(SampleBuffer::new(needed as u64, spec));
            }
            if let Some(buf) = buffer.as_mut() {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        let channels = channels.ok_or_else(|| AudioError::InvalidParameters {
            details: "No channel information found".to_string(),
        })?;

        Ok(AudioData::new(
            samples,
            sample_rate,
            channels,
            path,
            AudioFormat {
                extension: extension.to_string(),
                bit_depth: codec_params.bits_per_sample.map(|b| b as u16),
                codec: Some(format!("{:?}", codec_params.codec)),
            },
        ))
    }

    /// Convert an integer sample to `-1.0..1.0`. hound already yields
    /// 8-bit samples as signed values.
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Lowercased file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn is_format_supported(extension: &str) -> bool {
        let extension = extension.to_lowercase();
        extension == "wav" || SYMPHONIA_EXTENSIONS.contains(&extension.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioLoader::detect_format("test.wav"), Some("wav".to_string()));
        assert_eq!(AudioLoader::detect_format("clip.MP4"), Some("mp4".to_string()));
        assert_eq!(AudioLoader::detect_format("test"), None);
    }

    #[test]
    fn test_format_support() {
        assert!(AudioLoader::is_format_supported("wav"));
        assert!(AudioLoader::is_format_supported("webm"));
        assert!(AudioLoader::is_format_supported("MOV"));
        assert!(!AudioLoader::is_format_supported("xyz"));
    }

    #[test]
    fn test_int_to_float_conversion() {
        assert_eq!(AudioLoader::int_to_float(0, 16), 0.0);
        assert_eq!(AudioLoader::int_to_float(-32768, 16), -1.0);
        assert_eq!(AudioLoader::int_to_float(0, 8), 0.0);
        assert_eq!(AudioLoader::int_to_float(-128, 8), -1.0);
    }

    #[test]
    fn test_load_int_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4000 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let audio = AudioLoader::load(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.frames(), 4000);
        assert!((audio.duration - 0.5).abs() < 1e-9);
        assert_eq!(audio.samples[0], 0.5);
        assert_eq!(audio.samples[1], -0.5);
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.xyz");
        File::create(&path).unwrap().write_all(b"dummy content").unwrap();

        match AudioLoader::load(&path) {
            Err(crate::error::FxError::Audio(AudioError::UnsupportedFormat { format })) => {
                assert_eq!(format, "xyz")
            }
            other => panic!("Expected UnsupportedFormat error, got {:?}", other.map(|a| a.frames())),
        }
    }

    #[test]
    fn test_garbage_container_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mp4");
        File::create(&path).unwrap().write_all(b"not really a video").unwrap();

        assert!(AudioLoader::load(&path).is_err());
    }
}
