//! Error handling for hostwatch
//!
//! Transient network conditions never become errors: a silent host is
//! offline and a refused port is simply not responsive. What remains here
//! are configuration problems and round-level failures.

use thiserror::Error;
use std::io;

/// Main error type for probing operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Permission denied: {0}")]
    PermissionError(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Probe task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for probe operations
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Classify an io error raised while opening or using a socket.
    ///
    /// Descriptor or buffer exhaustion means the round cannot be trusted
    /// and is reported as `ResourceExhausted`; anything else is an ordinary
    /// network failure for that one probe.
    pub fn from_io(e: io::Error) -> Self {
        match e.raw_os_error() {
            Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOBUFS) | Some(libc::ENOMEM) => {
                ScanError::ResourceExhausted(e.to_string())
            }
            _ if e.kind() == io::ErrorKind::PermissionDenied => {
                ScanError::PermissionError(e.to_string())
            }
            _ => ScanError::NetworkError(e.to_string()),
        }
    }

    /// Whether this error must fail the whole round instead of a single probe
    pub fn is_round_fatal(&self) -> bool {
        matches!(self, ScanError::ResourceExhausted(_) | ScanError::TaskFailed(_))
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(e: tokio::task::JoinError) -> Self {
        ScanError::TaskFailed(e.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(e: toml::de::Error) -> Self {
        ScanError::ConfigError(format!("Failed to parse TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_exhaustion_is_round_fatal() {
        let err = ScanError::from_io(io::Error::from_raw_os_error(libc::EMFILE));
        assert!(matches!(err, ScanError::ResourceExhausted(_)));
        assert!(err.is_round_fatal());
    }

    #[test]
    fn test_refused_connection_is_not_fatal() {
        let err = ScanError::from_io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(err, ScanError::NetworkError(_)));
        assert!(!err.is_round_fatal());
    }

    #[test]
    fn test_permission_denied_classification() {
        let err = ScanError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ScanError::PermissionError(_)));
    }
}
