// ============================================
// File: crates/tunnelscope-capture/src/lib.rs
// ============================================
//! # tunnelscope Capture - Live Frame Sources
//!
//! ## Creation Reason
//! Provides the capture side of the traffic observer: a trait for
//! anything that yields link-layer frames, a Linux packet-socket
//! implementation bound to the VPN interface, and an in-memory source
//! for tests.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `FrameSource`, `CaptureConfig`, `CapturedFrame`
//! - [`source`]: `PacketSocket` (Linux) and `MockSource`
//! - [`error`]: Capture-specific error types
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          VPN interface (wg0), decrypted traffic          │
//! │                       │                                  │
//! │            ┌──────────▼──────────┐                      │
//! │            │  kernel: ETH_P_IP   │  non-IPv4 dropped     │
//! │            └──────────┬──────────┘                      │
//! │                       │                                  │
//! │            ┌──────────▼──────────┐                      │
//! │            │    PacketSocket     │  snaplen, timeout     │
//! │            └──────────┬──────────┘                      │
//! │                       ▼                                  │
//! │              capture loop (server)                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Platform Support
//! | Platform | PacketSocket | MockSource |
//! |----------|--------------|------------|
//! | Linux | ✅ | ✅ |
//! | other | ❌ | ✅ |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Opening a packet socket requires root or CAP_NET_RAW
//! - Sources are blocking; run them on a dedicated thread
//! - Mock implementation available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial capture layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod source;
pub mod traits;

// Re-export primary types
pub use error::{CaptureError, Result};
pub use traits::{CaptureConfig, CapturedFrame, FrameSource};

#[cfg(target_os = "linux")]
pub use source::linux::PacketSocket;

#[cfg(any(test, feature = "mock"))]
pub use source::mock::MockSource;
