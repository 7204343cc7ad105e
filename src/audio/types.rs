use std::path::{Path, PathBuf};

/// Decoded audio with metadata
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, interleaved when there is more than one channel
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Duration in seconds
    pub duration: f64,

    /// File the audio was decoded from
    pub file_path: PathBuf,

    pub format: AudioFormat,
}

impl AudioData {
    pub fn new<P: AsRef<Path>>(samples: Vec<f32>, sample_rate: u32, channels: u16, path: P, format: AudioFormat) -> Self {
        let mut audio = Self {
            samples,
            sample_rate,
            channels,
            duration: 0.0,
            file_path: path.as_ref().to_path_buf(),
            format,
        };
        audio.duration = audio.time_for_frame(audio.frames());
        audio
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Time in seconds at the start of a frame
    pub fn time_for_frame(&self, frame: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frame as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Container and codec information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFormat {
    /// File extension (wav, mp3, mp4, ...)
    pub extension: String,

    /// Bit depth (16, 24, 32, ...)
    pub bit_depth: Option<u16>,

    /// Codec reported by the demuxer
    pub codec: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let audio = AudioData::new(vec![0.0; 44100 * 2], 44100, 2, "a.wav", AudioFormat::default());
        assert_eq!(audio.frames(), 44100);
        assert_eq!(audio.duration, 1.0);
    }

    #[test]
    fn test_peak() {
        let audio = AudioData::new(vec![0.1, -0.8, 0.3], 10, 1, "a.wav", AudioFormat::default());
        assert_eq!(audio.peak(), 0.8);
    }
}
