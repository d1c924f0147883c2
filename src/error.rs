use thiserror::Error;

/// Main error type for the reactive-reel library
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid clip range: {details}")]
    InvalidClipRange { details: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },

    #[error("Audio encoding failed: {reason}")]
    EncodeFailed { reason: String },
}

/// Visualizer errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Visualizer not found: {name}")]
    NotFound { name: String },

    #[error("Visualizer initialization failed: {name} - {reason}")]
    InitFailed { name: String, reason: String },

    #[error("Overlay could not be prepared: {reason}")]
    OverlayFailed { reason: String },
}

/// Export pipeline errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Frame recorder unavailable: {reason}")]
    RecorderUnavailable { reason: String },

    #[error("Frame recorder failed: {reason}")]
    RecorderFailed { reason: String },

    #[error("Transcoding failed: {reason}")]
    TranscodeFailed { reason: String },

    #[error("Invalid export options: {details}")]
    InvalidOptions { details: String },
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

/// Convenience type alias for Results using ReelError
pub type Result<T> = std::result::Result<T, ReelError>;

impl ReelError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (the export can be retried from scratch)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Audio(AudioError::LoadFailed { .. }) => true,
            Self::Export(ExportError::RecorderFailed { .. }) => true,
            // Validation and missing host capabilities won't change on retry
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Audio(AudioError::InvalidClipRange { details }) => {
                format!("The selected clip range is not valid: {}", details)
            }
            Self::Render(RenderError::NotFound { name }) => {
                format!("Visualizer '{}' not found. Available visualizers: pulse, bars, particles", name)
            }
            Self::Export(ExportError::RecorderUnavailable { .. }) => {
                "Video capture is not available on this system. Please install FFmpeg with VP8/VP9 support.".to_string()
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
    fn test_recoverable_classification() {
        let io = ReelError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_recoverable());

        let unavailable: ReelError = ExportError::RecorderUnavailable {
            reason: "no ffmpeg".to_string(),
        }
        .into();
        assert!(!unavailable.is_recoverable());

        let range: ReelError = AudioError::InvalidClipRange {
            details: "in >= out".to_string(),
        }
        .into();
        assert!(!range.is_recoverable());
    }

    #[test]
    fn test_user_message_mentions_visualizer() {
        let err: ReelError = RenderError::NotFound { name: "laser".to_string() }.into();
        assert!(err.user_message().contains("laser"));
        assert!(err.user_message().contains("pulse"));
    }
}
