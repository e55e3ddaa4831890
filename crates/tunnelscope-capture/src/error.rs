// ============================================
// File: crates/tunnelscope-capture/src/error.rs
// ============================================
//! # Capture Error Types
//!
//! ## Creation Reason
//! Defines error types for opening and reading capture sources.
//!
//! ## Error Categories
//! 1. **Open Errors**: Missing interface, channel setup, privileges.
//!    Fatal to the observation feature, reported once at startup.
//! 2. **Read Errors**: Failures while waiting for the next frame
//! 3. **Configuration Errors**: Invalid snapshot length, device names
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never retry an open error silently; the operator must see it
//! - Read timeouts are not errors, sources return `Ok(None)`
//! - Only interrupted reads are retryable; any other read error (link
//!   deleted, `ENETDOWN`) ends the capture session
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

// ============================================
// CaptureError
// ============================================

/// Capture layer error types.
#[derive(Error, Debug)]
pub enum CaptureError {
    // ========================================
    // Open Errors
    // ========================================

    /// Failed to open the capture session.
    #[error("Failed to open capture on '{device}': {reason}")]
    OpenFailed {
        /// Interface name
        device: String,
        /// Why opening failed
        reason: String,
    },

    /// Interface does not exist.
    #[error("Network interface '{device}' not found")]
    DeviceNotFound {
        /// Interface name
        device: String,
    },

    /// Permission denied for operation.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// What operation was denied
        operation: String,
    },

    // ========================================
    // Read Errors
    // ========================================

    /// Reading the next frame failed.
    #[error("Capture read failed: {source}")]
    ReadFailed {
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The source has been closed and yields no more frames.
    #[error("Capture source closed")]
    Closed,

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field name
        field: String,
        /// Why it's invalid
        reason: String,
    },
}

impl CaptureError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `OpenFailed` error.
    pub fn open_failed(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ReadFailed` error.
    #[must_use]
    pub const fn read_failed(source: io::Error) -> Self {
        Self::ReadFailed { source }
    }

    /// Maps an OS error raised while opening `device`.
    pub fn from_open_io(device: &str, operation: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: format!("{operation} on {device}"),
            },
            io::ErrorKind::NotFound => Self::DeviceNotFound {
                device: device.to_string(),
            },
            _ => Self::open_failed(device, format!("{operation}: {err}")),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the capture loop may keep reading after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReadFailed { source } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns `true` if this error occurred while opening the source.
    #[must_use]
    pub const fn is_open_error(&self) -> bool {
        matches!(
            self,
            Self::OpenFailed { .. }
                | Self::DeviceNotFound { .. }
                | Self::PermissionDenied { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Returns `true` if this error requires elevated privileges.
    #[must_use]
    pub const fn requires_privileges(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

// ============================================
// Tests
// ============================================
