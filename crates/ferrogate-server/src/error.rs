// ============================================
// File: crates/ferrogate-server/src/error.rs
// ============================================
//! # Server Error Types

use thiserror::Error;

use ferrogate_common::CommonError;
use ferrogate_core::CoreError;
use ferrogate_transport::TransportError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to read or parse a configuration file.
    #[error("failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the configuration file.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// A configuration field failed validation.
    #[error("invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Qualified field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A fatal error during server startup.
    #[error("server failed to start: {reason}")]
    StartupFailed {
        /// Why startup failed.
        reason: String,
    },

    /// Error from the protocol core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `StartupFailed` error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    /// Returns `true` for read/write deadline expiries, which are logged
    /// quietly instead of as request failures.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_timeout())
    }

    /// Returns `true` for errors that must abort startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } | Self::StartupFailed { .. }
        )
    }
}
