// ============================================
// File: crates/tunnelscope-core/src/addressing/mod.rs
// ============================================
//! # Addressing
//!
//! ## Main Functionality
//! - [`range`]: `AddressRange`, pure address arithmetic over one CIDR block
//! - [`pool`]: `AddressPool`, the network/broadcast/server exclusion policy
//!
//! ## ⚠️ Important Note for Next Developer
//! - Neither type holds mutable state; serializing "last assigned" is the
//!   caller's job
//! - Widening to IPv6 means widening the integer behind the same API
//!
//! ## Last Modified
//! v0.1.0 - Initial addressing module

pub mod pool;
pub mod range;

pub use pool::AddressPool;
pub use range::{AddressRange, Addresses};
