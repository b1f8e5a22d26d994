// ============================================
// File: crates/ferrogate-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the error kinds produced by the framing, cryptographic and
//! decoding layers. Every crypto or framing failure aborts the in-flight
//! request; the connection layer decides whether to close (TCP) or drop
//! the datagram (UDP).
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key material or plaintext in error messages
//! - Duplicate-sequence suppression is NOT an error; ciphers signal it by
//!   returning an empty decode result
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use ferrogate_common::CommonError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error kinds for framing, crypto and payload decoding.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Padding / block crypto
    // ========================================
    /// Block length is zero or otherwise unusable.
    #[error("invalid block length {0}")]
    InvalidBlockLen(usize),

    /// PKCS#7 padding bytes are inconsistent.
    #[error("invalid padding")]
    InvalidPadding,

    /// Data length is zero or not a multiple of the block size.
    #[error("invalid data length {0}")]
    InvalidDataLen(usize),

    // ========================================
    // Framing
    // ========================================
    /// The frame is structurally unusable (bad length prefix, truncated
    /// header, oversized frame).
    #[error("bad frame: {reason}")]
    BadFrame {
        /// What is wrong with the frame.
        reason: String,
    },

    /// The frame checksum does not match the header.
    #[error("frame checksum mismatch: header {expected:#018x}, computed {computed:#018x}")]
    BadChecksum {
        /// Checksum claimed by the header.
        expected: u64,
        /// Checksum computed over the frame.
        computed: u64,
    },

    /// Protocol version outside the accepted set {1, 2}.
    #[error("unsupported transfer version {0}")]
    UnsupportedVersion(u32),

    // ========================================
    // Asymmetric crypto
    // ========================================
    /// RSA parsing, decryption or signing failed.
    #[error("rsa operation failed: {reason}")]
    RsaFailure {
        /// Why the operation failed.
        reason: String,
    },

    // ========================================
    // Payload decoding
    // ========================================
    /// The decrypted payload does not parse as the configured envelope.
    #[error("bad payload envelope: {reason}")]
    BadEnvelope {
        /// Why the envelope is invalid.
        reason: String,
    },

    /// Cipher or decoder variant name not recognized.
    #[error("unsupported variant '{0}'")]
    UnsupportedVariant(String),

    // ========================================
    // Session state
    // ========================================
    /// Stream mode requested while completing a handshake.
    #[error("stream mode not allowed during handshake")]
    StreamNotAllowed,

    /// An operation that needs a negotiated AES key ran before any
    /// handshake completed.
    #[error("no session key established")]
    MissingSessionKey,

    // ========================================
    // I/O
    // ========================================
    /// The configured read deadline elapsed.
    #[error("read timed out")]
    TimeoutRead,

    /// The configured write deadline elapsed.
    #[error("write timed out")]
    TimeoutWrite,

    /// Socket failure surfaced through cipher I/O.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `BadFrame` error.
    pub fn bad_frame(reason: impl Into<String>) -> Self {
        Self::BadFrame {
            reason: reason.into(),
        }
    }

    /// Creates an `RsaFailure` error.
    pub fn rsa_failure(reason: impl Into<String>) -> Self {
        Self::RsaFailure {
            reason: reason.into(),
        }
    }

    /// Creates a `BadEnvelope` error.
    pub fn bad_envelope(reason: impl Into<String>) -> Self {
        Self::BadEnvelope {
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures of cryptographic material rather than
    /// message structure.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPadding | Self::RsaFailure { .. } | Self::MissingSessionKey
        )
    }

    /// Returns `true` for malformed or invalid wire input.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::BadFrame { .. }
                | Self::BadChecksum { .. }
                | Self::UnsupportedVersion(_)
                | Self::BadEnvelope { .. }
                | Self::InvalidDataLen(_)
        )
    }

    /// Returns `true` if this is a read or write deadline expiry.
    ///
    /// Timeouts are routine on idle listeners and are logged at debug
    /// level only.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutRead | Self::TimeoutWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::BadChecksum {
            expected: 0xdead,
            computed: 0xbeef,
        };
        assert!(err.to_string().contains("checksum"));

        let err = CoreError::UnsupportedVersion(9);
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::InvalidPadding.is_crypto_error());
        assert!(CoreError::rsa_failure("decrypt").is_crypto_error());

        assert!(CoreError::bad_frame("short").is_protocol_error());
        assert!(CoreError::UnsupportedVersion(3).is_protocol_error());

        assert!(CoreError::TimeoutRead.is_timeout());
        assert!(!CoreError::TimeoutRead.is_protocol_error());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_length(16, 3);
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
