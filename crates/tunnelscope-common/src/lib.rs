// ============================================
// File: crates/tunnelscope-common/src/lib.rs
// ============================================
//! # tunnelscope Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides the small set of types shared by the address allocator,
//! the capture sources and the traffic observer.
//!
//! ## Main Functionality
//! - [`types`]: `SubscriberId`, `LinkType`
//! - [`time`]: Capture timestamps
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              tunnelscope-server                     │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   tunnelscope-core    tunnelscope-capture          │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │           tunnelscope-common  ◄── You are here    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies
//! - Keep external dependencies minimal
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{LinkType, SubscriberId};
