use thiserror::Error;

/// Main error type for the Clipsmith library
#[derive(Error, Debug)]
pub enum ClipsmithError {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Console error: {0}")]
    App(#[from] AppError),

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

    #[error("Failed to write audio file {path}: {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Time-stretch failed: {reason}")]
    StretchFailed { reason: String },

    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load video file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported video format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Frame processing failed: {reason}")]
    FrameProcessingFailed { reason: String },

    #[error("Clip has no audio track: {name}")]
    NoAudioTrack { name: String },

    #[error("FFmpeg not found. Please install FFmpeg.")]
    FfmpegUnavailable,

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors from the concatenation and audio/video merge components
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Input file is missing: {path}")]
    MissingInput { path: String },

    #[error("Audio duration {duration:.4}s is too short to reconcile (minimum {minimum:.4}s)")]
    InvalidAudioDuration { duration: f64, minimum: f64 },

    #[error("Reconciliation would loop audio {count} times (limit {limit})")]
    LoopLimitExceeded { count: usize, limit: usize },

    #[error("Output generation failed: {reason}")]
    OutputFailed { reason: String },

    #[error("Invalid composition parameters: {details}")]
    InvalidParameters { details: String },
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

/// Interactive console errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input stream closed")]
    InputClosed,

    #[error("Invalid number: {input}")]
    InvalidNumber { input: String },
}

/// Convenience type alias for Results using ClipsmithError
pub type Result<T> = std::result::Result<T, ClipsmithError>;

impl ClipsmithError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the user can fix this by retrying with different input
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::App(AppError::InvalidNumber { .. }) => true,
            Self::Audio(AudioError::LoadFailed { .. }) => true,
            Self::Audio(AudioError::UnsupportedFormat { .. }) => true,
            Self::Video(VideoError::LoadFailed { .. }) => true,
            Self::Video(VideoError::UnsupportedFormat { .. }) => true,
            Self::Composition(CompositionError::MissingInput { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::LoadFailed { path }) => {
                format!("Could not load video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::FfmpegUnavailable) => {
                "FFmpeg is required for video work. Install it and make sure `ffmpeg` and `ffprobe` are on PATH.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::App(AppError::InvalidNumber { input }) => {
                format!("'{}' is not a valid number.", input)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_convert() {
        let err: ClipsmithError = AudioError::UnknownAction { name: "louder".to_string() }.into();
        assert!(matches!(err, ClipsmithError::Audio(AudioError::UnknownAction { .. })));
        assert_eq!(err.to_string(), "Audio processing error: Unknown action: louder");
    }

    #[test]
    fn test_recoverable_classification() {
        let missing: ClipsmithError = CompositionError::MissingInput { path: "a.mp4".to_string() }.into();
        assert!(missing.is_recoverable());

        let limit: ClipsmithError = CompositionError::LoopLimitExceeded { count: 20, limit: 10 }.into();
        assert!(!limit.is_recoverable());
    }

    #[test]
    fn test_user_message_mentions_path() {
        let err: ClipsmithError = VideoError::LoadFailed { path: "clip.mov".to_string() }.into();
        assert!(err.user_message().contains("clip.mov"));
    }
}
