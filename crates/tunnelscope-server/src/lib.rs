// ============================================
// File: crates/tunnelscope-server/src/lib.rs
// ============================================
//! # tunnelscope Server Library
//!
//! ## Creation Reason
//! Wires the address allocator and the capture layer into the two
//! services a VPN control plane needs: sequential lease allocation and
//! live per-device traffic feeds.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: TOML configuration
//! - [`server`]: Process lifecycle
//! - [`services`]: Business logic services
//!   - [`services::observer`]: Capture loop and subscriber fan-out
//!   - [`services::registry`]: IP → subscriber bookkeeping
//!   - [`services::lease`]: Sequential address leasing
//!   - [`services::stats`]: Observer counters
//! - [`handlers`]: Per-frame decode and dispatch
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       tunnelscope server                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌──────────────────┐    ┌──────────────┐  │
//! │  │   Config    │────►│      Server      │───►│ LeaseService │  │
//! │  └─────────────┘     └────────┬─────────┘    └──────────────┘  │
//! │                               │                                 │
//! │                      ┌────────▼─────────┐                       │
//! │                      │ TrafficObserver  │◄── subscribe(ip, id)  │
//! │                      │  capture thread  │──► PacketReceiver     │
//! │                      └────────┬─────────┘                       │
//! │                               │                                 │
//! ├───────────────────────────────┼─────────────────────────────────┤
//! │                 Capture Layer │                                 │
//! │                      ┌────────▼─────────┐                       │
//! │                      │   PacketSocket   │  (wg0, IPv4 only)     │
//! │                      └──────────────────┘                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Live capture requires root or CAP_NET_RAW
//! - Configuration changes require restart (no hot-reload)
//! - The capture thread runs until it fails; a failed loop closes every
//!   subscriber stream and ends `Server::run` with the error
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::Server;
pub use services::{LeaseService, PacketReceiver, TrafficObserver};
