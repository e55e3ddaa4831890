// ============================================
// File: crates/tunnelscope-core/src/packet/headers.rs
// ============================================
//! # Parsed Header Fields
//!
//! Plain `Copy` structs filled in place by [`HeaderDecoder`] and copied
//! into [`PacketRecord`] for subscribers.
//!
//! [`HeaderDecoder`]: crate::packet::HeaderDecoder
//! [`PacketRecord`]: crate::packet::PacketRecord

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};

// ============================================
// MacAddr
// ============================================

/// 48-bit hardware address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================
// EthernetFields
// ============================================

/// Ethernet II header fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EthernetFields {
    /// Source hardware address.
    pub source: MacAddr,
    /// Destination hardware address.
    pub destination: MacAddr,
    /// EtherType of the payload.
    pub ether_type: u16,
}

// ============================================
// Ipv4Fields
// ============================================

/// IPv4 header fields relevant to traffic inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ipv4Fields {
    /// Source address.
    pub source: Ipv4Addr,
    /// Destination address.
    pub destination: Ipv4Addr,
    /// Payload protocol number (6 = TCP, 17 = UDP, 1 = ICMP).
    pub protocol: u8,
    /// Time to live.
    pub ttl: u8,
    /// Header length in bytes.
    pub header_len: u8,
    /// Total length from the header (header + payload).
    pub total_len: u16,
    /// Identification field.
    pub identification: u16,
    /// Don't Fragment flag.
    pub dont_fragment: bool,
    /// More Fragments flag.
    pub more_fragments: bool,
}

impl Default for Ipv4Fields {
    fn default() -> Self {
        Self {
            source: Ipv4Addr::UNSPECIFIED,
            destination: Ipv4Addr::UNSPECIFIED,
            protocol: 0,
            ttl: 0,
            header_len: 0,
            total_len: 0,
            identification: 0,
            dont_fragment: false,
            more_fragments: false,
        }
    }
}
