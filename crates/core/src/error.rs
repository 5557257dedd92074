//! Error types for termstore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::ids::Nid;
use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for termstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the versioned entity store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, log replay, etc.)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// A nid was queried that the identity directory never assigned
    #[error("Nid not found: {0}")]
    NidNotFound(Nid),

    /// A UUID was queried that no component carries
    #[error("UUID not found: {0}")]
    UuidNotFound(Uuid),

    /// Decoded token or format version differs from the expected one
    #[error("Format mismatch: expected token {expected:#04x}, got {actual:#04x}")]
    FormatMismatch {
        /// Token the decoder was asked to construct
        expected: u8,
        /// Token found in the byte stream
        actual: u8,
    },

    /// Data corruption detected (truncated record, bad size hint, CRC failure)
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A version kind was appended to a chronology that does not accept it
    #[error("Incompatible version: {version} cannot be appended to a {entity} chronology")]
    IncompatibleVersion {
        /// Chronology kind name
        entity: &'static str,
        /// Version kind name
        version: &'static str,
    },

    /// Provider was started twice
    #[error("Provider already running: {0}")]
    AlreadyRunning(String),

    /// Provider was used while stopped
    #[error("Provider not running: {0}")]
    NotRunning(String),

    /// No provider could be selected or created
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Configuration file could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid operation or argument
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// True for the recoverable lookup-miss class (`NidNotFound`, `UuidNotFound`)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NidNotFound(_) | Error::UuidNotFound(_))
    }

    /// True for lifecycle state errors
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Error::AlreadyRunning(_) | Error::NotRunning(_) | Error::ProviderUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::IoError(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_display_nid_not_found() {
        let err = Error::NidNotFound(Nid::from_raw(42));
        let msg = err.to_string();
        assert!(msg.contains("Nid not found"));
        assert!(msg.contains("42"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_format_mismatch() {
        let err = Error::FormatMismatch {
            expected: 0x03,
            actual: 0x05,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x03"));
        assert!(msg.contains("0x05"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_display_incompatible_version() {
        let err = Error::IncompatibleVersion {
            entity: "Concept",
            version: "Description",
        };
        let msg = err.to_string();
        assert!(msg.contains("Description"));
        assert!(msg.contains("Concept"));
    }

    #[test]
    fn test_state_errors() {
        assert!(Error::AlreadyRunning("memory".into()).is_state_error());
        assert!(Error::NotRunning("memory".into()).is_state_error());
        assert!(Error::ProviderUnavailable("none".into()).is_state_error());
        assert!(!Error::Corruption("crc".into()).is_state_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
