// src/error.rs

//! Unified error handling for the collector application.

use std::fmt;

use thiserror::Error;

use crate::models::UnitKey;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outright
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// SQLite access failed outside of a unit write
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered 429; the limiter is out of step with the site.
    #[error("Rate limit exceeded at {url}")]
    RateLimitExceeded { url: String },

    /// Network failure or unexpected status; retried on a later run.
    #[error("Transient fetch failure for {url}: {detail}")]
    TransientFetch { url: String, detail: String },

    /// Expected page structure was absent.
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// A unit's transaction was rolled back.
    #[error("Write conflict for {unit}: {message}")]
    WriteConflict { unit: UnitKey, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed page error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPage(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a write conflict for a unit.
    pub fn write_conflict(unit: &UnitKey, message: impl fmt::Display) -> Self {
        Self::WriteConflict {
            unit: unit.clone(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_conflict_names_unit() {
        let unit = UnitKey::new("MIA", 2016);
        let err = AppError::write_conflict(&unit, "CHECK constraint failed");
        assert_eq!(
            err.to_string(),
            "Write conflict for MIA 2016: CHECK constraint failed"
        );
    }

    #[test]
    fn test_malformed_message() {
        let err = AppError::malformed("games table not found");
        assert!(matches!(err, AppError::MalformedPage(_)));
        assert_eq!(err.to_string(), "Malformed page: games table not found");
    }
}
