//! Error types for the Xinyu client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole client.
///
/// Every failure that crosses a crate boundary is expressed as one of these
/// variants. None of them carries a machine-readable code; the controller only
/// logs them and recovers locally.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum XinyuError {
    /// Transport or HTTP-level failure talking to the backend.
    ///
    /// `status` is `None` when no response was received at all.
    #[error("HTTP error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Http { status: Option<u16>, message: String },

    /// IO error (config file, log directory)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl XinyuError {
    /// Creates an Http error for a response with the given status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an Http error for a request that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Http {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is an HTTP/transport error
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// Returns the HTTP status code, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for XinyuError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for XinyuError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for XinyuError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, XinyuError>`.
pub type Result<T> = std::result::Result<T, XinyuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_with_status() {
        let err = XinyuError::http(503, "service unavailable");
        assert_eq!(err.to_string(), "HTTP error (503): service unavailable");
        assert_eq!(err.status(), Some(503));
        assert!(err.is_http());
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let err = XinyuError::transport("connection refused");
        assert_eq!(err.to_string(), "HTTP error: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_from_toml_error() {
        let err: XinyuError = toml::from_str::<toml::Value>("= broken")
            .unwrap_err()
            .into();
        assert!(matches!(err, XinyuError::Serialization { ref format, .. } if format == "TOML"));
    }
}
