// ============================================
// File: crates/ferrogate-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Provides the foundational error enum shared by all FerroGate crates so
//! higher layers can wrap it with `#[from]`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key material in error messages
//! - Keep variants coarse; crate-specific errors belong in that crate
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Base error types shared across FerroGate crates.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter.
        field: String,
        /// Description of what is wrong.
        reason: String,
    },

    /// Data length doesn't match the expected size.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Encoding or decoding of an external representation failed.
    #[error("encoding error: {reason}")]
    Encoding {
        /// Description of the failure.
        reason: String,
    },

    /// I/O error from the operating system.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Creates an `Encoding` error.
    pub fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("cipher", "missing key argument");
        assert!(err.to_string().contains("cipher"));

        let err = CommonError::invalid_length(16, 7);
        assert!(err.to_string().contains("16"));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: CommonError = io.into();
        assert!(matches!(err, CommonError::Io(_)));
    }
}
