// ============================================
// File: crates/tunnelscope-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use tunnelscope_capture::error::CaptureError;
use tunnelscope_core::error::CoreError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// File that was being loaded
        path: String,
        /// Read or parse failure
        reason: String,
    },

    /// A configuration value was rejected by validation.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Dotted path of the offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A capture loop is already running for this observer.
    #[error("Capture already started on '{device}'")]
    CaptureAlreadyStarted {
        /// Observed interface
        device: String,
    },

    /// The server could not be brought up.
    #[error("Server failed to start: {reason}")]
    StartupFailed {
        /// What went wrong
        reason: String,
    },

    /// Unexpected condition, such as a panicked capture thread.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },

    /// Address allocation error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Capture open or read error.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// I/O error from the system.
    #[error("I/O error: {0}")]
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

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for configuration load and validation failures.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` for address allocation failures.
    #[must_use]
    pub const fn is_allocation_error(&self) -> bool {
        match self {
            Self::Core(e) => e.is_allocation_error(),
            _ => false,
        }
    }

    /// Returns `true` if the server cannot keep running after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::ConfigLoad { .. } | Self::StartupFailed { .. } => true,
            Self::Capture(e) => e.is_open_error(),
            _ => false,
        }
    }
}
