//! Error types for Autopost

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AutopostError>;

#[derive(Error, Debug)]
pub enum AutopostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AutopostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AutopostError::InvalidInput(_) => 3,
            AutopostError::Platform(PlatformError::Authentication(_)) => 2,
            AutopostError::Platform(_) => 1,
            AutopostError::Config(_) => 1,
            AutopostError::Content(_) => 1,
            AutopostError::Media(_) => 1,
        }
    }

    /// True when the remote service rejected our credentials
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AutopostError::Platform(PlatformError::Authentication(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content file not found: {0}")]
    NotFound(String),

    #[error("Content file '{path}' has no '{column}' column")]
    MissingColumn { path: String, column: String },

    #[error("Failed to read content file '{path}': {reason}")]
    Read { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media folder not found: {0}")]
    FolderMissing(String),

    #[error("Found {found} media file(s) in '{folder}', at least {required} required")]
    Insufficient {
        folder: String,
        found: usize,
        required: usize,
    },

    #[error("Failed to read media '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Media upload failed: {0}")]
    Upload(String),

    #[error("Media processing failed: {0}")]
    Processing(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}
