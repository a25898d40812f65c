//! Error types for zrak-core.
//!
//! This module defines the errors that can surface from fetching, parsing and
//! publishing ARSO feed data.
//!
//! # When Errors Surface
//!
//! Most failures never reach the caller. The service degrades to cached data
//! whenever it has some:
//!
//! | Operation | Cache present | No cache |
//! |-----------|---------------|----------|
//! | Latest snapshot refresh | stale snapshot returned | error returned |
//! | Historical refresh inside a snapshot refresh | stale index kept | empty index kept |
//! | Direct historical request | stale series returned | error returned |
//! | Payload publishing | logged, refresh continues | logged, refresh continues |
//!
//! Malformed individual fields inside a well-formed document are never
//! reported; they become absent values.
//!
//! # Error Classification
//!
//! [`Error::is_network`] groups transport failures and non-2xx responses. The
//! core never retries; callers decide whether to try again later.

use thiserror::Error;

/// Errors that can occur while fetching and processing ARSO feeds.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("Request to {url} failed: {source}")]
    Network {
        /// The feed URL.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status outside 200-299.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus {
        /// The feed URL.
        url: String,
        /// The response status code.
        status: u16,
    },

    /// The feed document is structurally invalid.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    Task(String),

    /// Serialization of a shared document failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while writing or reading a shared document.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a non-2xx status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::HttpStatus { .. })
    }

    /// Whether this error came from a structurally invalid document.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::MalformedInput(_))
    }
}

impl From<zrak_types::ParseError> for Error {
    fn from(err: zrak_types::ParseError) -> Self {
        Error::MalformedInput(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}

/// Result type alias using zrak-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::http_status("https://example.test/feed.xml", 503);
        assert_eq!(
            err.to_string(),
            "Request to https://example.test/feed.xml returned HTTP 503"
        );

        let err = Error::MalformedInput("bad tag".to_string());
        assert_eq!(err.to_string(), "Malformed input: bad tag");

        let err = Error::invalid_config("empty url");
        assert_eq!(err.to_string(), "Invalid configuration: empty url");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::http_status("u", 404).is_network());
        assert!(!Error::http_status("u", 404).is_malformed_input());
        assert!(Error::MalformedInput("x".into()).is_malformed_input());
        assert!(!Error::MalformedInput("x".into()).is_network());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = zrak_types::ParseError::malformed(7, "eof").into();
        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(err.to_string().contains("byte 7"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
