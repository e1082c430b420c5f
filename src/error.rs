//! Error types for briefcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BriefcastError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Script errors
    #[error("Script contains no speakable text")]
    EmptyScript,

    // Synthesis errors
    #[error("Speech backend failed: {message}")]
    Tts { message: String },

    #[error("Synthesis failed for segment {segment_index}: {cause}")]
    Synthesis { segment_index: usize, cause: String },

    // Audio errors
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    #[error("Track assembly failed: {message}")]
    Assembly { message: String },

    // Publishing errors
    #[error("Publish failed: {cause}")]
    Publish { cause: String },

    #[error("Feed generation failed: {message}")]
    Feed { message: String },

    #[error("Remote upload failed: {message}")]
    Upload { message: String },

    // Content generation errors
    #[error("Text generation failed: {message}")]
    Generation { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BriefcastError>;

impl BriefcastError {
    /// Pipeline stage the error belongs to, used in run diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            BriefcastError::ConfigFileNotFound { .. }
            | BriefcastError::ConfigParse { .. }
            | BriefcastError::ConfigInvalidValue { .. }
            | BriefcastError::Config(_) => "config",
            BriefcastError::EmptyScript => "segment",
            BriefcastError::Tts { .. } | BriefcastError::Synthesis { .. } => "synthesize",
            BriefcastError::AudioDecode { .. } | BriefcastError::Assembly { .. } => "assemble",
            BriefcastError::Publish { .. } | BriefcastError::Upload { .. } => "publish",
            BriefcastError::Feed { .. } => "feed",
            BriefcastError::Generation { .. } => "generate",
            BriefcastError::Io(_) | BriefcastError::Other(_) => "run",
        }
    }
}
