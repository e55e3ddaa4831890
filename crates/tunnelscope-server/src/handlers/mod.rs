// ============================================
// File: crates/tunnelscope-server/src/handlers/mod.rs
// ============================================
//! # Frame Handlers
//!
//! ## Creation Reason
//! Provides the per-frame work of the capture loop, kept separate from
//! the loop itself so it can be driven directly in tests.
//!
//! ### Submodules
//! - [`frame`]: Decode → classify → dispatch
//!
//! ## Data Flow
//! ```text
//! Capture thread:
//!   1. Read frame into the reused buffer
//!   2. Decode Ethernet/IPv4 headers into decoder-owned fields
//!   3. Build Flow { src, dst }
//!   4. Look up subscribers of src and dst
//!   5. If any: copy once into Arc<PacketRecord>, try_send to each
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers must be fast (critical path)
//! - Nothing here may block or log per frame
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod frame;

pub use frame::{FrameHandler, FrameOutcome};
