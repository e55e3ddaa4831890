// ============================================
// File: crates/tunnelscope-core/src/lib.rs
// ============================================
//! # tunnelscope Core - Addressing and Frame Decoding
//!
//! ## Creation Reason
//! Holds the pure, allocation-light logic of tunnelscope: address
//! arithmetic over the device subnet and the decode step of the
//! capture pipeline.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`addressing`]: `AddressRange` (start/finish/next/addresses) and
//!   the reservable `AddressPool`
//! - [`packet`]: `HeaderDecoder`, `Flow` and `PacketRecord`
//! - [`error`]: Core error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              tunnelscope-server                     │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   tunnelscope-core    tunnelscope-capture          │
//! │   You are here ◄──                                 │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │           tunnelscope-common                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - IPv4 only: all address math is on `u32`
//! - Nothing here does I/O or holds locks
//! - The decoder is on the per-packet hot path; do not allocate in it
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod addressing;
pub mod error;
pub mod packet;

// Re-export primary types
pub use addressing::{AddressPool, AddressRange, Addresses};
pub use error::{CoreError, DecodeError, Result};
pub use packet::{Flow, HeaderDecoder, PacketRecord};
