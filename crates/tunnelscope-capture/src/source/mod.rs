// ============================================
// File: crates/tunnelscope-capture/src/source/mod.rs
// ============================================
//! # Frame Sources
//!
//! ## Platform Implementations
//! - `linux`: `pnet` layer 3 channel bound to one interface
//! - `mock`: In-memory implementation for testing
//!
//! ## What is captured?
//! The live source hands over bare IPv4 packets: on a WireGuard
//! interface there is no link header, and on an Ethernet interface the
//! kernel strips it. Sources that do deliver Ethernet frames (recorded
//! traffic, the mock) say so via `link_type()`.
//!
//! ## Last Modified
//! v0.1.0 - Initial source module

// Platform-specific implementations
#[cfg(target_os = "linux")]
pub mod linux;

// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::PacketSocket;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockSource;
