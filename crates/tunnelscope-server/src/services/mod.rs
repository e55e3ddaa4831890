// ============================================
// File: crates/tunnelscope-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Provides the business logic of tunnelscope, separated from
//! configuration and the capture layer.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`observer`]: Capture loop lifecycle and subscriptions
//! - [`registry`]: IP → subscriber bookkeeping and fan-out
//! - [`lease`]: Sequential address leasing
//! - [`stats`]: Capture counters
//!
//! ## Service Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐ │
//! │  │  TrafficObserver │──►│      SubscriberRegistry         │ │
//! │  │                  │   │  - IP → {subscriber id}         │ │
//! │  │  - capture loop  │   │  - id → bounded channel         │ │
//! │  │  - ObserverStats │   │  - one RwLock over both         │ │
//! │  └──────────────────┘   └─────────────────────────────────┘ │
//! │                                                             │
//! │  ┌──────────────────┐                                       │
//! │  │   LeaseService   │  AddressRange::next under a mutex     │
//! │  └──────────────────┘                                       │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Services are testable in isolation (mock frame source)
//! - Thread-safe (Send + Sync), share them through `Arc`
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod lease;
pub mod observer;
pub mod registry;
pub mod stats;

// Re-export primary types
pub use lease::LeaseService;
pub use observer::{CaptureHandle, TrafficObserver};
pub use registry::{Delivery, PacketReceiver, SubscriberRegistry};
pub use stats::{ObserverStats, StatsSnapshot};
