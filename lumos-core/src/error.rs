use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please review it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Controller errors
    #[error("Show controller unavailable: {reason}")]
    ControllerUnavailable { reason: String },

    #[error("Invalid controller payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    // Donation errors
    #[error("Invalid donation: {reason}")]
    InvalidDonation { reason: String },

    // Storage errors
    #[error("Donation database error: {0}")]
    DatabaseError(#[from] tokio_rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
