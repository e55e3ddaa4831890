// ============================================
// File: crates/tunnelscope-capture/src/source/linux.rs
// ============================================
//! # Linux Packet Socket
//!
//! ## Creation Reason
//! Captures IPv4 packets from one interface through a `pnet` datalink
//! channel, without linking libpcap.
//!
//! ## Main Functionality
//! - Layer 3 channel with protocol `ETH_P_IP`, so the kernel discards
//!   everything that is not IPv4 before we see it
//! - Bounded reads through the channel read timeout
//! - Snapshot length enforced by the channel read buffer
//! - Original length recovered from the IPv4 total length field
//! - Promiscuous mode only when configured
//!
//! ## Open Sequence
//! 1. Look up the interface by name (`datalink::interfaces`)
//! 2. Open a `ChannelType::Layer3(ETH_P_IP)` channel on it
//! 3. Keep the receiving half, drop the sender
//!
//! ## Required Capabilities
//! - `CAP_NET_RAW`: For opening packet sockets
//! - Or run as root
//!
//! ## ⚠️ Important Note for Next Developer
//! - A layer 3 channel is a `SOCK_DGRAM` packet socket: the kernel strips
//!   the link header, so every frame starts at the IPv4 header whatever
//!   the interface type
//! - Both directions are delivered (incoming and outgoing)
//! - The socket stays bound to the interface index it was opened on; if
//!   the interface is deleted and recreated, reads fail and the session
//!   must be reopened
//!
//! ## Last Modified
//! v0.1.0 - Packet socket on pnet datalink channels

#![cfg(target_os = "linux")]

use std::fmt;
use std::io;

use pnet::datalink::{self, Channel, ChannelType, Config, DataLinkReceiver, NetworkInterface};
use tracing::{debug, info, warn};

use tunnelscope_common::time::CaptureTimestamp;
use tunnelscope_common::LinkType;

use crate::error::{CaptureError, Result};
use crate::traits::{CaptureConfig, CapturedFrame, FrameSource};

// ============================================
// Constants
// ============================================

/// EtherType of IPv4.
const ETH_P_IP: u16 = 0x0800;

/// Offset of the total length field in the IPv4 header.
const IPV4_TOTAL_LEN_OFFSET: usize = 2;

// ============================================
// PacketSocket
// ============================================

/// Blocking IPv4 capture on a single interface.
///
/// # Example
/// ```ignore
/// let mut socket = PacketSocket::open(CaptureConfig::new("wg0"))?;
/// let mut buf = vec![0u8; socket.snapshot_len()];
/// while let Some(frame) = socket.next_frame(&mut buf)? {
///     println!("{} bytes", frame.len);
/// }
/// ```
pub struct PacketSocket {
    /// Receiving half of the datalink channel
    rx: Box<dyn DataLinkReceiver>,
    /// Session configuration
    config: CaptureConfig,
    /// Kernel interface index
    ifindex: u32,
}

impl PacketSocket {
    /// Opens a capture session on `config.device`.
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration is invalid
    /// - `DeviceNotFound` if the interface does not exist
    /// - `PermissionDenied` without `CAP_NET_RAW`
    /// - `OpenFailed` for any other channel error
    pub fn open(config: CaptureConfig) -> Result<Self> {
        config.validate()?;

        info!(
            device = %config.device,
            snapshot_len = config.snapshot_len,
            promiscuous = config.promiscuous,
            "Opening packet capture"
        );

        let interface = find_interface(&config.device)?;
        if !interface.is_up() {
            warn!(device = %config.device, "Interface is down, capture will idle until it is up");
        }

        let channel = datalink::channel(&interface, channel_config(&config))
            .map_err(|e| CaptureError::from_open_io(&config.device, "datalink channel", &e))?;

        let rx = match channel {
            Channel::Ethernet(_tx, rx) => rx,
            #[allow(unreachable_patterns)]
            _ => {
                return Err(CaptureError::open_failed(
                    &config.device,
                    "unexpected datalink channel type",
                ))
            }
        };

        info!(
            device = %config.device,
            ifindex = interface.index,
            "Packet capture opened"
        );

        Ok(Self {
            rx,
            config,
            ifindex: interface.index,
        })
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl fmt::Debug for PacketSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketSocket")
            .field("device", &self.config.device)
            .field("ifindex", &self.ifindex)
            .finish_non_exhaustive()
    }
}

impl FrameSource for PacketSocket {
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<CapturedFrame>> {
        let packet = match self.rx.next() {
            Ok(packet) => packet,
            Err(e) => {
                return match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Ok(None),
                    _ => Err(CaptureError::read_failed(e)),
                };
            }
        };

        let len = packet.len().min(buf.len()).min(self.config.snapshot_len);
        buf[..len].copy_from_slice(&packet[..len]);

        Ok(Some(CapturedFrame {
            len,
            original_len: original_len(packet),
            timestamp: CaptureTimestamp::now(),
        }))
    }

    fn link_type(&self) -> LinkType {
        LinkType::RawIp
    }

    fn device(&self) -> &str {
        &self.config.device
    }

    fn snapshot_len(&self) -> usize {
        self.config.snapshot_len
    }
}

// ============================================
// Helpers
// ============================================

fn channel_config(config: &CaptureConfig) -> Config {
    Config {
        read_buffer_size: config.snapshot_len,
        read_timeout: Some(config.read_timeout),
        channel_type: ChannelType::Layer3(ETH_P_IP),
        promiscuous: config.promiscuous,
        ..Config::default()
    }
}

fn find_interface(device: &str) -> Result<NetworkInterface> {
    let interface = datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == device)
        .ok_or_else(|| CaptureError::DeviceNotFound {
            device: device.to_string(),
        })?;

    debug!(device = %device, index = interface.index, flags = interface.flags, "Interface found");
    Ok(interface)
}

/// Length of the packet on the wire.
///
/// The channel truncates to the snapshot length without saying so; the
/// IPv4 total length still tells the original size.
fn original_len(packet: &[u8]) -> usize {
    let captured = packet.len();
    match packet.get(IPV4_TOTAL_LEN_OFFSET..IPV4_TOTAL_LEN_OFFSET + 2) {
        Some(&[hi, lo]) => captured.max(usize::from(u16::from_be_bytes([hi, lo]))),
        _ => captured,
    }
}

// ============================================
// Tests
// ============================================
