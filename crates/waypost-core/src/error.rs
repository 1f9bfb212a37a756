//! Error types for the Waypost proximity notifier.
//!
//! Every failure mode in the system is local and recoverable: geolocation
//! errors degrade the watch, selection errors are rejected synchronously with
//! a user-facing prompt, and configuration errors abort startup before any
//! state exists. All errors implement `std::error::Error` and are
//! serializable for logging.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias using WaypostError as the error type.
pub type Result<T> = std::result::Result<T, WaypostError>;

/// Top-level error type for all Waypost operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum WaypostError {
    /// Geolocation source errors
    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    /// Selection and arming errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for WaypostError {
    fn from(err: io::Error) -> Self {
        WaypostError::Io(err.to_string())
    }
}

/// Errors reported by a geolocation source.
///
/// None of these are fatal: permission failures disable monitoring for the
/// session, and stream errors (timeouts included) are surfaced through the
/// watch's error channel without tearing the watch down.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationError {
    /// The user denied the geolocation permission
    #[error("Geolocation permission denied")]
    PermissionDenied,

    /// No geolocation capability is available on this host
    #[error("Geolocation unavailable: {reason}")]
    Unavailable { reason: String },

    /// No fix arrived within the staleness window
    #[error("No position fix within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A second watch was requested while one is still live
    #[error("A position watch is already active")]
    WatchAlreadyActive,

    /// The continuous stream reported a transient failure
    #[error("Position stream error: {reason}")]
    Stream { reason: String },
}

impl GeolocationError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a stream error.
    pub fn stream(reason: impl Into<String>) -> Self {
        Self::Stream {
            reason: reason.into(),
        }
    }

    /// Returns true if the watch should keep running after this error.
    ///
    /// Timeouts and transient stream failures leave the subscription alive;
    /// only permission loss makes further updates impossible.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GeolocationError::Timeout { .. } | GeolocationError::Stream { .. }
        )
    }
}

/// Errors raised by selection and arming operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionError {
    /// Arming was requested with no active marker
    #[error("Nothing designated: select a marker before arming")]
    NothingDesignated,

    /// An event referenced a marker key the registry does not hold
    #[error("Unknown marker: {key}")]
    UnknownMarker { key: String },
}

impl SelectionError {
    /// Creates an unknown-marker error.
    pub fn unknown_marker(key: impl Into<String>) -> Self {
        Self::UnknownMarker { key: key.into() }
    }
}

/// Errors related to configuration loading and validation.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Duplicate POI key in the configured list
    #[error("Duplicate POI key: {key}")]
    DuplicatePoiKey { key: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a load failed error.
    pub fn load_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation failed error.
    pub fn validation_failed(reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geolocation_error_recoverable() {
        assert!(GeolocationError::Timeout { timeout_ms: 10_000 }.is_recoverable());
        assert!(GeolocationError::stream("fix dropped").is_recoverable());
        assert!(!GeolocationError::PermissionDenied.is_recoverable());
        assert!(!GeolocationError::unavailable("no backend").is_recoverable());
    }

    #[test]
    fn test_selection_error_display() {
        let err = SelectionError::NothingDesignated;
        assert!(err.to_string().contains("select a marker"));

        let err = SelectionError::unknown_marker("poi-9");
        assert!(err.to_string().contains("poi-9"));
    }

    #[test]
    fn test_config_error_helpers() {
        let err = ConfigError::invalid_value("monitor.radius_m", "must be positive");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = ConfigError::file_not_found("config/config.yaml");
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: WaypostError = io_err.into();
        assert!(matches!(err, WaypostError::Io(_)));
    }

    #[test]
    fn test_error_serialization() {
        let err = WaypostError::Selection(SelectionError::NothingDesignated);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Selection"));
    }
}
