// ============================================
// File: crates/tunnelscope-server/src/handlers/frame.rs
// ============================================
//! # Frame Handler
//!
//! ## Creation Reason
//! Turns one captured frame into zero or one shared `PacketRecord`
//! delivered to the matching subscribers.
//!
//! ## Main Functionality
//! - Header decode with a reused `HeaderDecoder`
//! - Flow classification
//! - Dispatch through the `SubscriberRegistry`
//! - Counter updates in `ObserverStats`
//!
//! ## ⚠️ Important Note for Next Developer
//! - One handler per capture loop (it owns the decoder state)
//! - Undecodable frames are counted, never logged
//!
//! ## Last Modified
//! v0.1.0 - Initial frame handler

use tunnelscope_capture::CapturedFrame;
use tunnelscope_common::LinkType;
use tunnelscope_core::{DecodeError, HeaderDecoder};

use crate::services::registry::{Delivery, SubscriberRegistry};
use crate::services::stats::ObserverStats;

// ============================================
// FrameOutcome
// ============================================

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The decoder rejected the frame.
    Undecodable(DecodeError),
    /// Decoded, but nobody watches either endpoint.
    Unmatched,
    /// A record was built and offered to subscribers.
    Dispatched(Delivery),
}

// ============================================
// FrameHandler
// ============================================

/// Per-frame decode and dispatch.
#[derive(Debug)]
pub struct FrameHandler {
    decoder: HeaderDecoder,
}

impl FrameHandler {
    /// Creates a handler for frames of `link_type`.
    #[must_use]
    pub fn new(link_type: LinkType) -> Self {
        Self {
            decoder: HeaderDecoder::new(link_type),
        }
    }

    /// Handles `frame`, the captured bytes described by `meta`.
    pub fn handle(
        &mut self,
        frame: &[u8],
        meta: &CapturedFrame,
        registry: &SubscriberRegistry,
        stats: &ObserverStats,
    ) -> FrameOutcome {
        stats.record_frame();

        let flow = match self.decoder.decode(frame) {
            Ok(flow) => flow,
            Err(e) => {
                stats.record_decode_failure();
                return FrameOutcome::Undecodable(e);
            }
        };
        stats.record_decoded();

        let decoder = &self.decoder;
        match registry.dispatch(flow, || decoder.record(frame, meta.original_len, meta.timestamp)) {
            Some(delivery) => {
                stats.record_dispatch(&delivery);
                FrameOutcome::Dispatched(delivery)
            }
            None => FrameOutcome::Unmatched,
        }
    }
}

// ============================================
// Tests
// ============================================
