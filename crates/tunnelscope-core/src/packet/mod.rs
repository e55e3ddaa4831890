// ============================================
// File: crates/tunnelscope-core/src/packet/mod.rs
// ============================================
//! # Packet Decoding
//!
//! ## Creation Reason
//! Implements the Decode and Classify stages of the capture pipeline,
//! and the immutable record handed to subscribers.
//!
//! ## Pipeline
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐   ┌────────────────┐
//! │  frame   │──►│ HeaderDecoder│──►│   Flow    │──►│ dispatch (srv) │
//! │ (&[u8])  │   │ eth + ipv4   │   │ src, dst  │   │                │
//! └──────────┘   └──────┬───────┘   └───────────┘   └───────┬────────┘
//!                       │ only when someone is subscribed    │
//!                       └──────────► PacketRecord ◄──────────┘
//! ```
//!
//! ## Main Functionality
//! - [`headers`]: Parsed Ethernet and IPv4 header fields
//! - [`decode`]: `HeaderDecoder`, reused across frames
//! - [`flow`]: `Flow` (source, destination)
//! - [`record`]: `PacketRecord`, the owned copy given to subscribers
//!
//! ## ⚠️ Important Note for Next Developer
//! - Header fields are overwritten by every `decode` call; copy them into
//!   a `PacketRecord` before handing them to another task
//! - Decode failures are expected traffic, not errors worth logging
//!
//! ## Last Modified
//! v0.1.0 - Initial packet module

pub mod decode;
pub mod flow;
pub mod headers;
pub mod record;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use decode::HeaderDecoder;
pub use flow::Flow;
pub use headers::{EthernetFields, Ipv4Fields, MacAddr};
pub use record::PacketRecord;
