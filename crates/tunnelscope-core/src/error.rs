// ============================================
// File: crates/tunnelscope-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the allocation errors returned by the address allocator and
//! the per-frame decode errors of the capture pipeline.
//!
//! ## Error Categories
//! 1. **Allocation Errors**: address outside the block, block exhausted
//! 2. **Configuration Errors**: unparsable or non-IPv4 networks
//! 3. **Decode Errors**: frames that are not well-formed IPv4
//!
//! ## ⚠️ Important Note for Next Developer
//! - `AddressesExhausted` is terminal: callers must refuse provisioning,
//!   never wrap around to the start of the block
//! - `DecodeError` is `Copy` and carries no heap data; it is produced on
//!   the hot path and immediately discarded
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for address allocation.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Allocation Errors
    // ========================================

    /// The address is not contained in the configured network.
    #[error("Address {address} is not in network {network}")]
    AddressNotInRange {
        /// Address that was supplied
        address: Ipv4Addr,
        /// Configured network
        network: Ipv4Net,
    },

    /// The last address of the network has already been reached.
    #[error("No addresses left in network {network}")]
    AddressesExhausted {
        /// Configured network
        network: Ipv4Net,
    },

    /// The address is reserved and cannot be handed out.
    #[error("Address {address} is reserved in network {network}")]
    AddressReserved {
        /// Address that was supplied
        address: Ipv4Addr,
        /// Configured network
        network: Ipv4Net,
    },

    // ========================================
    // Configuration Errors
    // ========================================

    /// The network definition is invalid.
    #[error("Invalid network '{input}': {reason}")]
    InvalidNetwork {
        /// Text that failed to parse
        input: String,
        /// Why it was rejected
        reason: String,
    },
}

impl CoreError {
    /// Creates an `InvalidNetwork` error.
    pub fn invalid_network(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNetwork {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors produced by address allocation.
    #[must_use]
    pub const fn is_allocation_error(&self) -> bool {
        matches!(
            self,
            Self::AddressNotInRange { .. }
                | Self::AddressesExhausted { .. }
                | Self::AddressReserved { .. }
        )
    }

    /// Returns `true` when the subnet has no more addresses to hand out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::AddressesExhausted { .. })
    }
}

// ============================================
// DecodeError
// ============================================

/// Reason a captured frame could not be classified.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame shorter than the headers it should contain.
    #[error("frame truncated")]
    Truncated,

    /// Frame does not carry IPv4 (ARP, IPv6, ...).
    #[error("not an IPv4 frame")]
    NotIpv4,

    /// IPv4 header present but malformed.
    #[error("malformed IPv4 header")]
    Malformed,
}
