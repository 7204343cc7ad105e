use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, warn};

use crate::audio::{AudioEffect, AudioLoader, AudioWriter, EffectProcessor};
use crate::config::AudioConfig;
use crate::error::{Result, VideoError};

const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "webm"];

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A video file whose audio track can be edited
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    /// Path to the video file
    pub path: PathBuf,

    /// Name/identifier for the clip
    pub name: String,
}

impl VideoClip {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("clip")
            .to_string();
        Self { path, name }
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn is_supported(&self) -> bool {
        self.extension()
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// Applies an [`AudioEffect`] to a clip's soundtrack and remuxes it with FFmpeg
pub struct ClipAudioEditor {
    ffmpeg_binary: String,
    processor: EffectProcessor,
    temp_dir: Option<PathBuf>,
}

impl ClipAudioEditor {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        Ok(Self {
            ffmpeg_binary: config.ffmpeg_binary.clone(),
            processor: EffectProcessor::new(config.threads)?,
            temp_dir: None,
        })
    }

    pub fn check_ffmpeg_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn ensure_temp_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.temp_dir {
            return Ok(dir.clone());
        }

        let dir = std::env::temp_dir().join(format!(
            "canvas_fx_audio_{}_{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir)?;
        self.temp_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Write `clip` with `effect` applied to its audio to `output`.
    ///
    /// The video stream is copied untouched; the processed audio is encoded
    /// as AAC and the result is cut to the shorter of the two streams.
    pub fn apply<P: AsRef<Path>>(&mut self, clip: &VideoClip, effect: AudioEffect, output: P) -> Result<()> {
        let output = output.as_ref();
        effect.validate()?;

        if !clip.is_supported() {
            return Err(VideoError::UnsupportedFormat {
                format: clip.extension().unwrap_or_default(),
            }
            .into());
        }

        if !Self::check_ffmpeg_available(&self.ffmpeg_binary) {
            return Err(VideoError::FfmpegUnavailable {
                binary: self.ffmpeg_binary.clone(),
            }
            .into());
        }

        info!("Applying {} to {} ({:?})", effect.name(), clip.name, clip.path);

        let mut audio = AudioLoader::load(&clip.path)?;
        info!(
            "   Audio: {:.1}s, {} Hz, {} channels",
            audio.duration, audio.sample_rate, audio.channels
        );

        self.processor.apply(effect, &mut audio)?;

        let audio_path = self.ensure_temp_dir()?.join("fx_audio.wav");
        AudioWriter::write_wav(&audio, &audio_path)?;

        self.remux(&clip.path, &audio_path, output)?;
        info!("Saved {:?}", output);
        Ok(())
    }

    /// Arguments for muxing the video of `video` with the audio of `audio`
    pub fn remux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(16);
        args.push("-i".into());
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        for arg in ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-shortest", "-y"] {
            args.push(arg.into());
        }
        args.push(output.into());
        args
    }

    fn remux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let args = Self::remux_args(video, audio, output);
        debug!("Running {} {:?}", self.ffmpeg_binary, args);

        let result = Command::new(&self.ffmpeg_binary)
            .args(&args)
            .output()
            .map_err(|e| VideoError::MuxFailed {
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(VideoError::MuxFailed {
                reason: format!("FFmpeg failed: {}", stderr),
            }
            .into());
        }

        Ok(())
    }

    /// Remove the scratch directory
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("Failed to remove temporary directory: {}", e);
            }
        }
    }
}

impl Drop for ClipAudioEditor {
    fn drop(&mut self) {
        self.cleanup();
    }
}
