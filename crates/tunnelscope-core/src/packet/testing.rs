// ============================================
// File: crates/tunnelscope-core/src/packet/testing.rs
// ============================================
//! # Synthetic Frames
//!
//! Builders for the frames used in tests across the workspace. Enabled
//! with the `testing` feature.
//!
//! ## ⚠️ Important Note for Next Developer
//! - For tests only; builders panic on failure

use std::net::Ipv4Addr;

use etherparse::PacketBuilder;

/// Source MAC used by the Ethernet builders.
pub const SOURCE_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Destination MAC used by the Ethernet builders.
pub const DESTINATION_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

/// Builds a bare IPv4/UDP packet, as read from a tunnel device.
#[must_use]
pub fn udp_packet(src: Ipv4Addr, dst: Ipv4Addr, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4(src.octets(), dst.octets(), 64).udp(40_000, 53);
    let mut packet = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut packet, payload)
        .expect("writing to a Vec cannot fail");
    packet
}

/// Builds an Ethernet II frame carrying IPv4/UDP.
#[must_use]
pub fn ethernet_udp_frame(src: Ipv4Addr, dst: Ipv4Addr, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SOURCE_MAC, DESTINATION_MAC)
        .ipv4(src.octets(), dst.octets(), 64)
        .udp(40_000, 53);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut frame, payload)
        .expect("writing to a Vec cannot fail");
    frame
}

/// Builds a broadcast ARP request frame (who-has 10.0.0.1 tell 10.0.0.2).
#[must_use]
pub fn arp_frame() -> Vec<u8> {
    let mut frame = Vec::with_capacity(42);
    frame.extend_from_slice(&[0xff; 6]);
    frame.extend_from_slice(&SOURCE_MAC);
    frame.extend_from_slice(&0x0806u16.to_be_bytes());
    // htype=1, ptype=0x0800, hlen=6, plen=4, oper=1
    frame.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01]);
    frame.extend_from_slice(&SOURCE_MAC);
    frame.extend_from_slice(&[10, 0, 0, 2]);
    frame.extend_from_slice(&[0x00; 6]);
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame
}
