// ============================================
// File: crates/ferrogate-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! Bind-time errors are fatal at startup; accept and receive errors are
//! logged by the server loops, which then continue.

use std::net::SocketAddr;

use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Socket-level error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The configured listen address does not parse.
    #[error("invalid listen address '{addr}'")]
    InvalidAddress {
        /// The offending address string.
        addr: String,
    },

    /// Binding the listener failed.
    #[error("failed to bind {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Why binding failed.
        reason: String,
    },

    /// The address is already in use.
    #[error("address {addr} already in use")]
    AddressInUse {
        /// Address we tried to bind.
        addr: SocketAddr,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {reason}")]
    AcceptFailed {
        /// Why accepting failed.
        reason: String,
    },

    /// Receiving a datagram failed.
    #[error("receive failed: {reason}")]
    ReceiveFailed {
        /// Why receiving failed.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("i/o error during {context}: {source}")]
    Io {
        /// Operation that failed.
        context: String,
        /// The original error.
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the listener loop should keep running after
    /// observing this error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AcceptFailed { .. } | Self::ReceiveFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let addr: SocketAddr = "0.0.0.0:443".parse().unwrap();
        let err = TransportError::bind_failed(addr, "permission denied");
        assert!(err.to_string().contains("permission denied"));
        assert!(err.to_string().contains("0.0.0.0:443"));
    }

    #[test]
    fn test_transient_classification() {
        let err = TransportError::AcceptFailed {
            reason: "too many open files".into(),
        };
        assert!(err.is_transient());

        let err = TransportError::InvalidAddress {
            addr: "nope".into(),
        };
        assert!(!err.is_transient());
    }
}
