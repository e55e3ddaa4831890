// ============================================
// File: crates/tunnelscope-core/src/packet/record.rs
// ============================================
//! # Packet Record
//!
//! ## Creation Reason
//! The capture loop overwrites its decoder state and frame buffer for
//! every frame. Subscribers read packets asynchronously, so each matched
//! packet is copied once into an immutable `PacketRecord` and shared
//! behind an `Arc` by every subscriber that matched it.
//!
//! ## Serialized Form (JSON)
//! ```text
//! {
//!   "captured_at": 1700000000123456,
//!   "flow": { "src": "10.0.0.2", "dst": "1.1.1.1" },
//!   "link_type": "raw_ip",
//!   "ipv4": { "source": "10.0.0.2", ..., "protocol": 17, "ttl": 64 },
//!   "original_len": 33,
//!   "data": "<base64 of the captured bytes>"
//! }
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial packet record

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::{Serialize, Serializer};

use tunnelscope_common::time::CaptureTimestamp;
use tunnelscope_common::LinkType;

use crate::packet::headers::{EthernetFields, Ipv4Fields};
use crate::packet::Flow;

/// Owned, immutable copy of one captured packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    /// Capture time.
    pub captured_at: CaptureTimestamp,
    /// Source and destination of the packet.
    pub flow: Flow,
    /// Framing of `data`.
    pub link_type: LinkType,
    /// Ethernet header, absent on raw IP links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethernet: Option<EthernetFields>,
    /// IPv4 header fields.
    pub ipv4: Ipv4Fields,
    /// Length of the frame on the wire; larger than `data` when the
    /// snapshot length truncated it.
    pub original_len: usize,
    /// Captured bytes, starting at the link-layer header.
    #[serde(serialize_with = "serialize_base64")]
    pub data: Bytes,
}

impl PacketRecord {
    /// Returns `true` if the snapshot length cut the frame short.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.original_len
    }

    /// Returns the captured bytes from the IPv4 header onwards.
    #[must_use]
    pub fn ip_bytes(&self) -> Bytes {
        match self.link_type {
            LinkType::Ethernet => self.data.slice(ETHERNET_HEADER_LEN.min(self.data.len())..),
            LinkType::RawIp => self.data.clone(),
        }
    }
}

/// Length of an Ethernet II header.
const ETHERNET_HEADER_LEN: usize = 14;

fn serialize_base64<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(data))
}
