// ============================================
// File: crates/tunnelscope-core/src/packet/decode.rs
// ============================================
//! # Header Decoder
//!
//! ## Creation Reason
//! Decodes just enough of each captured frame to classify it: the
//! Ethernet header (when the link has one) and the IPv4 header.
//!
//! ## Frame Layout
//! ```text
//! Ethernet link:
//! ┌──────────┬──────────┬──────┬──────────────────┬───────────┐
//! │ dst mac  │ src mac  │ type │ IPv4 header      │ payload   │
//! │ 6 bytes  │ 6 bytes  │ 2    │ 20..60 bytes     │           │
//! └──────────┴──────────┴──────┴──────────────────┴───────────┘
//!
//! Raw IP link (wireguard, tun):
//! ┌──────────────────┬───────────┐
//! │ IPv4 header      │ payload   │
//! └──────────────────┴───────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - One decoder per capture loop; it is `!Sync` by usage, not by type
//! - `decode` borrows the frame and writes into fields owned by the
//!   decoder; it must not allocate
//! - Call `record` only after a subscriber matched
//!
//! ## Last Modified
//! v0.1.0 - Initial decoder

use bytes::Bytes;
use etherparse::{EtherType, Ethernet2Header, Ethernet2HeaderSlice, Ipv4HeaderSlice};

use tunnelscope_common::time::CaptureTimestamp;
use tunnelscope_common::LinkType;

use crate::error::DecodeError;
use crate::packet::headers::{EthernetFields, Ipv4Fields, MacAddr};
use crate::packet::{Flow, PacketRecord};

// ============================================
// Constants
// ============================================

/// Minimum IPv4 header size.
const IPV4_HEADER_MIN_SIZE: usize = 20;

// ============================================
// HeaderDecoder
// ============================================

/// Reusable Ethernet + IPv4 decoder.
///
/// # Example
/// ```
/// use std::net::Ipv4Addr;
/// use tunnelscope_common::LinkType;
/// use tunnelscope_core::HeaderDecoder;
///
/// let mut decoder = HeaderDecoder::new(LinkType::RawIp);
/// let mut packet = vec![0u8; 20];
/// packet[0] = 0x45;
/// packet[3] = 20;
/// packet[8] = 64;
/// packet[12..16].copy_from_slice(&[10, 0, 0, 2]);
/// packet[16..20].copy_from_slice(&[1, 1, 1, 1]);
///
/// let flow = decoder.decode(&packet).unwrap();
/// assert_eq!(flow.src, Ipv4Addr::new(10, 0, 0, 2));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderDecoder {
    /// Framing of the frames fed to this decoder
    link_type: LinkType,
    /// Last decoded Ethernet header
    ethernet: EthernetFields,
    /// Whether `ethernet` belongs to the last decoded frame
    has_ethernet: bool,
    /// Last decoded IPv4 header
    ipv4: Ipv4Fields,
}

impl HeaderDecoder {
    /// Creates a decoder for frames of the given link type.
    #[must_use]
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            ethernet: EthernetFields::default(),
            has_ethernet: false,
            ipv4: Ipv4Fields::default(),
        }
    }

    /// Returns the link type this decoder expects.
    #[must_use]
    pub const fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Decodes `frame` and returns its flow.
    ///
    /// On success the header accessors describe `frame` until the next
    /// call. On failure their contents are unspecified.
    ///
    /// # Errors
    /// - `Truncated`: frame shorter than the expected headers
    /// - `NotIpv4`: EtherType or IP version is not IPv4
    /// - `Malformed`: IPv4 header fails validation
    pub fn decode(&mut self, frame: &[u8]) -> Result<Flow, DecodeError> {
        self.has_ethernet = false;

        let ip_bytes = match self.link_type {
            LinkType::Ethernet => {
                let eth =
                    Ethernet2HeaderSlice::from_slice(frame).map_err(|_| DecodeError::Truncated)?;

                let ether_type = eth.ether_type();
                if ether_type != EtherType::IPV4 {
                    return Err(DecodeError::NotIpv4);
                }

                self.ethernet = EthernetFields {
                    source: MacAddr(eth.source()),
                    destination: MacAddr(eth.destination()),
                    ether_type: ether_type.0,
                };
                self.has_ethernet = true;

                &frame[Ethernet2Header::LEN..]
            }
            LinkType::RawIp => frame,
        };

        if ip_bytes.len() < IPV4_HEADER_MIN_SIZE {
            return Err(DecodeError::Truncated);
        }
        if ip_bytes[0] >> 4 != 4 {
            return Err(DecodeError::NotIpv4);
        }

        let ip = Ipv4HeaderSlice::from_slice(ip_bytes).map_err(|_| DecodeError::Malformed)?;

        self.ipv4 = Ipv4Fields {
            source: ip.source_addr(),
            destination: ip.destination_addr(),
            protocol: ip.protocol().0,
            ttl: ip.ttl(),
            header_len: ip.ihl() * 4,
            total_len: ip.total_len(),
            identification: ip.identification(),
            dont_fragment: ip.dont_fragment(),
            more_fragments: ip.more_fragments(),
        };

        Ok(Flow::new(self.ipv4.source, self.ipv4.destination))
    }

    /// Returns the Ethernet header of the last decoded frame, if any.
    #[must_use]
    pub fn ethernet(&self) -> Option<&EthernetFields> {
        self.has_ethernet.then_some(&self.ethernet)
    }

    /// Returns the IPv4 header of the last decoded frame.
    #[must_use]
    pub const fn ipv4(&self) -> &Ipv4Fields {
        &self.ipv4
    }

    /// Copies the last decoded frame into an owned record.
    ///
    /// `frame` must be the slice passed to the last successful `decode`.
    #[must_use]
    pub fn record(
        &self,
        frame: &[u8],
        original_len: usize,
        captured_at: CaptureTimestamp,
    ) -> PacketRecord {
        PacketRecord {
            captured_at,
            flow: Flow::new(self.ipv4.source, self.ipv4.destination),
            link_type: self.link_type,
            ethernet: self.ethernet().copied(),
            ipv4: self.ipv4,
            original_len,
            data: Bytes::copy_from_slice(frame),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::packet::testing;

    const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

    #[test]
    fn test_decode_raw_ip() {
        let mut decoder = HeaderDecoder::new(LinkType::RawIp);
        let packet = testing::udp_packet(CLIENT, REMOTE, b"hello");

        let flow = decoder.decode(&packet).unwrap();

        assert_eq!(flow, Flow::new(CLIENT, REMOTE));
        assert!(decoder.ethernet().is_none());
        assert_eq!(decoder.ipv4().protocol, 17);
        assert_eq!(decoder.ipv4().header_len, 20);
        assert_eq!(usize::from(decoder.ipv4().total_len), packet.len());
    }

    #[test]
    fn test_decode_ethernet() {
        let mut decoder = HeaderDecoder::new(LinkType::Ethernet);
        let frame = testing::ethernet_udp_frame(CLIENT, REMOTE, b"hello");

        let flow = decoder.decode(&frame).unwrap();

        assert_eq!(flow, Flow::new(CLIENT, REMOTE));
        let eth = decoder.ethernet().unwrap();
        assert_eq!(eth.ether_type, 0x0800);
        assert_eq!(eth.source, MacAddr(testing::SOURCE_MAC));
    }

    #[test]
    fn test_arp_is_not_ipv4() {
        let mut decoder = HeaderDecoder::new(LinkType::Ethernet);
        assert_eq!(
            decoder.decode(&testing::arp_frame()),
            Err(DecodeError::NotIpv4)
        );
        assert!(decoder.ethernet().is_none());
    }

    #[test]
    fn test_ipv6_is_not_ipv4() {
        let mut decoder = HeaderDecoder::new(LinkType::RawIp);
        let mut packet = vec![0u8; 40];
        packet[0] = 0x60;
        assert_eq!(decoder.decode(&packet), Err(DecodeError::NotIpv4));
    }

    #[test]
    fn test_truncated_frames() {
        let mut eth = HeaderDecoder::new(LinkType::Ethernet);
        assert_eq!(eth.decode(&[0u8; 10]), Err(DecodeError::Truncated));

        let frame = testing::ethernet_udp_frame(CLIENT, REMOTE, b"");
        assert_eq!(eth.decode(&frame[..20]), Err(DecodeError::Truncated));

        let mut raw = HeaderDecoder::new(LinkType::RawIp);
        assert_eq!(raw.decode(&[0x45, 0x00]), Err(DecodeError::Truncated));
        assert_eq!(raw.decode(&[]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_malformed_ihl() {
        let mut decoder = HeaderDecoder::new(LinkType::RawIp);
        let mut packet = testing::udp_packet(CLIENT, REMOTE, b"");
        // IHL of 4 words is below the minimum of 5
        packet[0] = 0x44;
        assert_eq!(decoder.decode(&packet), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_decoder_reused_across_frames() {
        let mut decoder = HeaderDecoder::new(LinkType::RawIp);
        let first = testing::udp_packet(CLIENT, REMOTE, b"a");
        let second = testing::udp_packet(REMOTE, Ipv4Addr::new(10, 0, 0, 9), b"bb");

        decoder.decode(&first).unwrap();
        let record = decoder.record(&first, first.len(), CaptureTimestamp::from_micros(1));

        let flow = decoder.decode(&second).unwrap();
        assert_eq!(flow.dst, Ipv4Addr::new(10, 0, 0, 9));

        // The record taken before is unaffected by the second decode
        assert_eq!(record.flow, Flow::new(CLIENT, REMOTE));
        assert_eq!(record.ipv4.source, CLIENT);
        assert_eq!(&record.data[..], &first[..]);
    }

    #[test]
    fn test_record_copies_frame() {
        let mut decoder = HeaderDecoder::new(LinkType::Ethernet);
        let mut frame = testing::ethernet_udp_frame(CLIENT, REMOTE, b"payload");
        decoder.decode(&frame).unwrap();

        let record = decoder.record(&frame, 1514, CaptureTimestamp::from_micros(42));
        frame.fill(0);

        assert_eq!(record.original_len, 1514);
        assert_eq!(record.captured_at.as_micros(), 42);
        assert_eq!(record.link_type, LinkType::Ethernet);
        assert!(record.ethernet.is_some());
        assert_ne!(record.data[0], 0);
    }
}
