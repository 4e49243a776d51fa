//! Error types for the medallion pipeline core.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for medallion operations.
///
/// The rate limiter and the key parser never produce these; they model every
/// outcome as state or as an absent descriptor.
#[derive(Error, Debug)]
pub enum MedallionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A storage notification payload is missing required fields
    #[error("Invalid storage notification: {0}")]
    InvalidNotification(String),

    /// Transport failure while calling an external API
    #[error("API request to {endpoint} failed: {message}")]
    Api { endpoint: String, message: String },

    /// The caller's retry budget ran out before a successful response
    #[error("Gave up on {endpoint} after {attempts} attempts (last status: {last_status:?})")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    /// A downstream processing job failed for a logical date
    #[error("Processing job for {date} failed: {message}")]
    Job { date: NaiveDate, message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<::config::ConfigError> for MedallionError {
    fn from(err: ::config::ConfigError) -> Self {
        MedallionError::Config(err.to_string())
    }
}

/// Result type alias for medallion operations.
pub type Result<T> = std::result::Result<T, MedallionError>;
