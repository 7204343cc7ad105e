use thiserror::Error;

/// Main error type for the canvas-fx library
#[derive(Error, Debug)]
pub enum FxError {
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Style transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Image decoding and encoding errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to load image file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to decode image {path}: {reason}")]
    DecodeFailed { path: String, reason: String },

    #[error("Failed to encode image: {reason}")]
    EncodeFailed { reason: String },

    #[error("Invalid image dimensions: {details}")]
    InvalidDimensions { details: String },
}

/// Overlay parameter violations.
///
/// Public overlay helpers turn these into an empty result; the `try_*`
/// variants surface the first violated constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error("Expected {expected} parameters, found {found}")]
    WrongArity { expected: usize, found: usize },

    #[error("Parameter '{field}' must be {expected}")]
    WrongType { field: String, expected: String },

    #[error("Parameter '{field}' out of range: {value}")]
    OutOfRange { field: String, value: String },

    #[error("Malformed parameter list: {reason}")]
    Malformed { reason: String },

    #[error("Emoji file not found: {path}")]
    EmojiNotFound { path: String },

    #[error("Could not read overlay image {path}: {reason}")]
    ImageUnreadable { path: String, reason: String },

    #[error("No usable font found (requested '{requested}')")]
    FontUnavailable { requested: String },

    #[error("Overlay not found: {name}")]
    NotFound { name: String },
}

/// Neural style transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to load network weights from {path}: {reason}")]
    ModelLoadFailed { path: String, reason: String },

    #[error("No network weights configured (set transfer.weights_path)")]
    MissingWeights,

    #[error("Layer count mismatch for {kind} features: expected {expected}, found {found}")]
    LayerMismatch {
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("Tensor backend failure: {reason}")]
    Backend { reason: String },

    #[error("Invalid transfer parameters: {details}")]
    InvalidParameters { details: String },
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio from: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("No decodable audio track in: {path}")]
    NoAudioTrack { path: String },

    #[error("Failed to write audio: {reason}")]
    WriteFailed { reason: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("FFmpeg not found (looked for '{binary}')")]
    FfmpegUnavailable { binary: String },

    #[error("Unsupported video format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Muxing audio into video failed: {reason}")]
    MuxFailed { reason: String },
}

/// Asset fetching and uploading errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Failed to upload {name}: {reason}")]
    UploadFailed { name: String, reason: String },

    #[error("Image reference cannot be resolved: {reference}")]
    Unresolvable { reference: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using FxError
pub type Result<T> = std::result::Result<T, FxError>;

impl FxError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            // Remote fetches and uploads may succeed on a later attempt
            Self::Asset(AssetError::FetchFailed { .. }) => true,
            Self::Asset(AssetError::UploadFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Image(ImageError::LoadFailed { path }) => {
                format!("Could not load image '{}'. Please check the file exists.", path)
            }
            Self::Image(ImageError::DecodeFailed { path, .. }) => {
                format!("'{}' is not an image format that can be decoded.", path)
            }
            Self::Transfer(TransferError::MissingWeights) => {
                "Style transfer needs pretrained VGG19 weights. Set transfer.weights_path in the config.".to_string()
            }
            Self::Video(VideoError::FfmpegUnavailable { binary }) => {
                format!("'{}' was not found. Please install FFmpeg.", binary)
            }
            Self::Overlay(OverlayError::NotFound { name }) => {
                format!("Overlay '{}' not found. Available overlays: text, emoji", name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_errors_convert() {
        let err: FxError = AudioError::LoadFailed {
            path: "clip.mp4".to_string(),
        }
        .into();
        assert!(matches!(err, FxError::Audio(AudioError::LoadFailed { .. })));
        assert_eq!(
            err.to_string(),
            "Audio processing error: Failed to load audio from: clip.mp4"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        let fetch: FxError = AssetError::FetchFailed {
            url: "https://example.com/a.png".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        assert!(fetch.is_recoverable());

        let weights: FxError = TransferError::MissingWeights.into();
        assert!(!weights.is_recoverable());
    }

    #[test]
    fn test_user_message_for_missing_image() {
        let err: FxError = ImageError::LoadFailed {
            path: "missing.png".to_string(),
        }
        .into();
        assert!(err.user_message().contains("missing.png"));
    }
}
