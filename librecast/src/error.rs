//! Error types for Recast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecastError>;

#[derive(Error, Debug)]
pub enum RecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl RecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RecastError::InvalidInput(_) => 3,
            RecastError::NotFound(_) => 4,
            RecastError::Platform(_) => 1,
            RecastError::Config(_) => 2,
            RecastError::Store(_) => 1,
        }
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
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to decode app data: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Concurrent modification: stored version {found} does not match loaded version {expected}")]
    Conflict { expected: u64, found: u64 },
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),
}
