use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for canvas-fx
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Neural style transfer settings
    pub transfer: TransferConfig,

    /// Text, watermark and emoji overlay settings
    pub overlay: OverlayConfig,

    /// Clip audio effect settings
    pub audio: AudioConfig,

    /// Remote fetch and snapshot upload settings
    pub assets: AssetConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.transfer.validate()?;
        self.audio.validate()?;
        self.assets.validate()?;
        Ok(())
    }
}

/// Style transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of optimizer iterations
    pub iterations: usize,

    /// Weight of the content reconstruction loss
    pub content_weight: f32,

    /// Weight of the style (Gram matrix) loss
    pub style_weight: f32,

    /// Longer side of loaded images, in pixels
    pub max_dim: u32,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Adam first moment decay
    pub beta_1: f32,

    /// Adam epsilon
    pub epsilon: f32,

    /// Number of intermediate snapshots kept for reporting
    pub snapshot_grid: usize,

    /// Pretrained VGG19 weights (burn named MessagePack record)
    pub weights_path: Option<PathBuf>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            content_weight: 1e3,
            style_weight: 1e-2,
            max_dim: 512,
            learning_rate: 5.0,
            beta_1: 0.99,
            epsilon: 1e-1,
            snapshot_grid: 2 * 5,
            weights_path: None,
        }
    }
}

impl TransferConfig {
    fn validate(&self) -> Result<()> {
        if !(self.content_weight.is_finite() && self.content_weight > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "transfer.content_weight".to_string(),
                value: self.content_weight.to_string()
            }.into());
        }

        if !(self.style_weight.is_finite() && self.style_weight > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "transfer.style_weight".to_string(),
                value: self.style_weight.to_string()
            }.into());
        }

        if self.max_dim == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transfer.max_dim".to_string(),
                value: self.max_dim.to_string()
            }.into());
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "transfer.learning_rate".to_string(),
                value: self.learning_rate.to_string()
            }.into());
        }

        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "transfer.epsilon".to_string(),
                value: self.epsilon.to_string()
            }.into());
        }

        if !(0.0..1.0).contains(&self.beta_1) {
            return Err(ConfigError::InvalidValue {
                key: "transfer.beta_1".to_string(),
                value: self.beta_1.to_string()
            }.into());
        }

        if self.snapshot_grid == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transfer.snapshot_grid".to_string(),
                value: self.snapshot_grid.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Directory holding the emoji PNG files
    pub emoji_dir: PathBuf,

    /// Extra font files searched by name before the bundled default face
    pub fonts_dir: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            emoji_dir: PathBuf::from("assets/emojis"),
            fonts_dir: None,
        }
    }
}

/// Clip audio effect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFmpeg executable used to remux processed audio
    pub ffmpeg_binary: String,

    /// Worker threads for per-sample effects
    pub threads: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            threads: num_cpus::get(),
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.ffmpeg_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "audio.ffmpeg_binary".to_string(),
                value: self.ffmpeg_binary.clone()
            }.into());
        }

        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "audio.threads".to_string(),
                value: self.threads.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Asset fetch and upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Where remote image references are downloaded to
    pub cache_dir: PathBuf,

    /// Where the local asset store keeps uploaded snapshots
    pub store_dir: PathBuf,

    /// Public URL prefix for stored snapshots; `file://` URLs when unset
    pub public_base_url: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("canvas-fx-cache"),
            store_dir: PathBuf::from("nst_snapshots"),
            public_base_url: None,
        }
    }
}

impl AssetConfig {
    fn validate(&self) -> Result<()> {
        if let Some(base) = &self.public_base_url {
            if base.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "assets.public_base_url".to_string(),
                    value: base.clone()
                }.into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transfer.iterations, 1000);
        assert_eq!(config.transfer.content_weight, 1e3);
        assert_eq!(config.transfer.style_weight, 1e-2);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.transfer.iterations = 42;
        original_config.transfer.weights_path = Some(PathBuf::from("vgg19.mpk"));

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.transfer.iterations, 42);
        assert_eq!(loaded_config.transfer.weights_path, Some(PathBuf::from("vgg19.mpk")));
        assert_eq!(loaded_config.overlay.emoji_dir, original_config.overlay.emoji_dir);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[transfer]\niterations = 10\n").unwrap();
        assert_eq!(config.transfer.iterations, 10);
        assert_eq!(config.transfer.max_dim, 512);
        assert_eq!(config.audio.ffmpeg_binary, "ffmpeg");
    }

    #[test]
    fn test_invalid_weights() {
        let mut config = Config::default();
        config.transfer.style_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transfer.content_weight = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_epsilon() {
        for epsilon in [0.0, -1e-3, f32::NAN, f32::INFINITY] {
            let mut config = Config::default();
            config.transfer.epsilon = epsilon;
            match config.validate() {
                Err(crate::error::FxError::Config(ConfigError::InvalidValue { key, .. })) => {
                    assert_eq!(key, "transfer.epsilon")
                }
                other => panic!("epsilon {} accepted: {:?}", epsilon, other),
            }
        }
    }

    #[test]
    fn test_invalid_snapshot_grid() {
        let mut config = Config::default();
        config.transfer.snapshot_grid = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(matches!(
            result,
            Err(crate::error::FxError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
