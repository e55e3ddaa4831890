// ============================================
// File: crates/tunnelscope-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Provides the base error type shared by all tunnelscope crates.
//!
//! ## Main Functionality
//! - `CommonError`: Parse failures of shared types (`SubscriberId`)
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Keep variants generic; domain errors belong in the owning crate
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across tunnelscope crates.
///
/// # Example
/// ```
/// use tunnelscope_common::error::{CommonError, Result};
///
/// fn check_id_len(bytes: &[u8]) -> Result<()> {
///     if bytes.len() != 16 {
///         return Err(CommonError::invalid_length(16, bytes.len()));
///     }
///     Ok(())
/// }
///
/// assert!(check_id_len(&[0; 3]).is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Failed to decode/deserialize data.
    #[error("Decoding error: {context}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Creates a `Decoding` error.
    pub fn decoding(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Decoding {
            context: context.into(),
            details: details.into(),
        }
    }
}
