// ============================================
// File: crates/tunnelscope-core/src/addressing/range.rs
// ============================================
//! # Address Range
//!
//! ## Creation Reason
//! Deterministic, boundary-correct enumeration of the addresses inside
//! the device subnet.
//!
//! ## Main Functionality
//! - `AddressRange::start`: network address
//! - `AddressRange::finish`: broadcast address
//! - `AddressRange::next`: successor of a given address
//! - `AddressRange::addresses`: every address, ascending
//!
//! ## Address Layout (10.0.0.0/24)
//! ```text
//! ┌──────────┬──────────┬─────┬────────────┬────────────┐
//! │ 10.0.0.0 │ 10.0.0.1 │ ... │ 10.0.0.254 │ 10.0.0.255 │
//! │  start   │          │     │            │   finish   │
//! └──────────┴──────────┴─────┴────────────┴────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `next` is pure: the caller owns "last assigned" and must serialize
//!   read-modify-write of it (see `LeaseService` in the server crate)
//! - `next` never wraps; exhaustion is reported as an error
//! - Which addresses are reservable is decided by `AddressPool`, not here
//!
//! ## Last Modified
//! v0.1.0 - Initial address range

use std::fmt;
use std::iter::FusedIterator;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;

use crate::error::{CoreError, Result};

// ============================================
// AddressRange
// ============================================

/// One IPv4 CIDR block.
///
/// Host bits of the configured base address are cleared on construction,
/// so `10.0.0.7/24` and `10.0.0.0/24` describe the same range.
///
/// # Example
/// ```
/// use std::net::Ipv4Addr;
/// use tunnelscope_core::AddressRange;
///
/// let range: AddressRange = "10.0.0.0/24".parse().unwrap();
/// assert_eq!(range.start(), Ipv4Addr::new(10, 0, 0, 0));
/// assert_eq!(range.finish(), Ipv4Addr::new(10, 0, 0, 255));
/// assert_eq!(range.next(Ipv4Addr::new(10, 0, 0, 1)).unwrap(), Ipv4Addr::new(10, 0, 0, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    network: Ipv4Net,
}

impl AddressRange {
    /// Creates a range from a parsed network.
    #[must_use]
    pub fn new(network: Ipv4Net) -> Self {
        Self {
            network: network.trunc(),
        }
    }

    /// Creates a range from a base address and prefix length.
    ///
    /// # Errors
    /// Returns `InvalidNetwork` if `prefix_len` exceeds 32.
    pub fn from_parts(base: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        let network = Ipv4Net::new(base, prefix_len).map_err(|e| {
            CoreError::invalid_network(format!("{base}/{prefix_len}"), e.to_string())
        })?;
        Ok(Self::new(network))
    }

    /// Returns the network (with host bits cleared).
    #[must_use]
    pub const fn network(&self) -> Ipv4Net {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.network.prefix_len()
    }

    /// Returns the netmask.
    #[must_use]
    pub fn netmask(&self) -> Ipv4Addr {
        self.network.netmask()
    }

    /// Returns the network address, the first address of the block.
    #[must_use]
    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.start_u32())
    }

    /// Returns the broadcast address, the last address of the block.
    #[must_use]
    pub fn finish(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.finish_u32())
    }

    /// Returns `true` if `address` lies inside the block.
    #[must_use]
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & self.mask_u32() == self.start_u32()
    }

    /// Returns the number of addresses in the block, network and
    /// broadcast included.
    #[must_use]
    pub fn len(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len()))
    }

    /// Always `false`: every block holds at least one address.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns the address that follows `current`.
    ///
    /// # Errors
    /// - `AddressNotInRange` if `current` is outside the block
    /// - `AddressesExhausted` if `current` is the broadcast address
    pub fn next(&self, current: Ipv4Addr) -> Result<Ipv4Addr> {
        if !self.contains(current) {
            return Err(CoreError::AddressNotInRange {
                address: current,
                network: self.network,
            });
        }

        let current = u32::from(current);
        if current == self.finish_u32() {
            return Err(CoreError::AddressesExhausted {
                network: self.network,
            });
        }

        // current < finish <= u32::MAX, so this cannot overflow
        Ok(Ipv4Addr::from(current + 1))
    }

    /// Enumerates every address from `start()` through `finish()`.
    #[must_use]
    pub fn addresses(&self) -> Addresses {
        Addresses {
            front: u64::from(self.start_u32()),
            back: u64::from(self.finish_u32()) + 1,
        }
    }

    fn mask_u32(&self) -> u32 {
        u32::from(self.network.netmask())
    }

    fn start_u32(&self) -> u32 {
        u32::from(self.network.addr()) & self.mask_u32()
    }

    fn finish_u32(&self) -> u32 {
        let mask = self.mask_u32();
        (self.start_u32() & mask) | !mask
    }
}

impl From<Ipv4Net> for AddressRange {
    fn from(network: Ipv4Net) -> Self {
        Self::new(network)
    }
}

impl FromStr for AddressRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let network: Ipv4Net = s
            .trim()
            .parse()
            .map_err(|e: ipnet::AddrParseError| CoreError::invalid_network(s, e.to_string()))?;
        Ok(Self::new(network))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

// ============================================
// Addresses
// ============================================

/// Ascending iterator over the addresses of an [`AddressRange`].
///
/// Bounds are kept as `u64` so a `/0` block (2^32 addresses) is
/// representable without overflow.
#[derive(Debug, Clone)]
pub struct Addresses {
    /// Next address to yield from the front
    front: u64,
    /// One past the last address to yield
    back: u64,
}

impl Iterator for Addresses {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.front >= self.back {
            return None;
        }
        let value = self.front;
        self.front += 1;
        u32::try_from(value).ok().map(Ipv4Addr::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.back.saturating_sub(self.front)).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Addresses {
    fn next_back(&mut self) -> Option<Ipv4Addr> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        u32::try_from(self.back).ok().map(Ipv4Addr::from)
    }
}

impl ExactSizeIterator for Addresses {}

impl FusedIterator for Addresses {}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn range(cidr: &str) -> AddressRange {
        cidr.parse().unwrap()
    }

    #[test]
    fn test_start_finish() {
        let r = range("10.0.0.0/24");
        assert_eq!(r.start(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(r.finish(), Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(r.len(), 256);
    }

    #[test]
    fn test_host_bits_cleared() {
        let r = range("10.0.0.77/24");
        assert_eq!(r.start(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(r.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_next_in_range() {
        let r = range("10.0.0.0/24");
        let next = r.next(Ipv4Addr::new(10, 0, 0, 1)).unwrap();
        assert_eq!(next, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn test_next_crosses_octet_boundary() {
        let r = range("10.0.0.0/16");
        let next = r.next(Ipv4Addr::new(10, 0, 0, 255)).unwrap();
        assert_eq!(next, Ipv4Addr::new(10, 0, 1, 0));
    }

    #[test]
    fn test_next_at_finish_is_exhausted() {
        let r = range("10.0.0.0/24");
        let result = r.next(Ipv4Addr::new(10, 0, 0, 255));
        assert!(matches!(result, Err(CoreError::AddressesExhausted { .. })));
    }

    #[test]
    fn test_next_outside_network() {
        let r = range("10.0.0.0/24");
        let result = r.next(Ipv4Addr::new(192, 168, 1, 1));
        assert!(matches!(
            result,
            Err(CoreError::AddressNotInRange { address, .. }) if address == Ipv4Addr::new(192, 168, 1, 1)
        ));

        // Adjacent blocks are outside too
        assert!(r.next(Ipv4Addr::new(10, 0, 1, 0)).is_err());
        assert!(r.next(Ipv4Addr::new(9, 255, 255, 255)).is_err());
    }

    #[test]
    fn test_single_address_block() {
        let r = range("10.0.0.9/32");
        assert_eq!(r.start(), r.finish());
        assert!(matches!(
            r.next(r.start()),
            Err(CoreError::AddressesExhausted { .. })
        ));
        assert_eq!(r.addresses().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 9)]);
    }

    #[test]
    fn test_point_to_point_block() {
        let r = range("10.0.0.4/31");
        assert_eq!(r.start(), Ipv4Addr::new(10, 0, 0, 4));
        assert_eq!(r.finish(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(r.next(r.start()).unwrap(), r.finish());
        assert!(r.next(r.finish()).unwrap_err().is_exhausted());
    }

    #[test]
    fn test_top_of_address_space_does_not_wrap() {
        let r = range("255.255.255.0/24");
        assert_eq!(r.finish(), Ipv4Addr::BROADCAST);
        assert!(r.next(Ipv4Addr::BROADCAST).unwrap_err().is_exhausted());
        assert_eq!(r.addresses().last(), Some(Ipv4Addr::BROADCAST));
    }

    #[test]
    fn test_addresses_slash_24() {
        let r = range("10.0.0.0/24");
        let all: Vec<Ipv4Addr> = r.addresses().collect();

        assert_eq!(all.len(), 256);
        assert_eq!(all[0], Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(all[255], Ipv4Addr::new(10, 0, 0, 255));
    }

    #[test]
    fn test_addresses_bounded_and_ascending() {
        for cidr in ["10.0.0.0/24", "172.16.4.0/22", "192.168.1.128/25", "100.64.0.0/30", "10.1.2.3/32"] {
            let r = range(cidr);
            let all: Vec<Ipv4Addr> = r.addresses().collect();

            assert_eq!(all.len() as u64, r.len(), "{cidr}");
            assert_eq!(all.first(), Some(&r.start()), "{cidr}");
            assert_eq!(all.last(), Some(&r.finish()), "{cidr}");
            assert!(all.windows(2).all(|w| w[0] < w[1]), "{cidr}");
            assert!(all.iter().all(|a| *a >= r.start() && *a <= r.finish()), "{cidr}");
            assert!(all.iter().all(|a| r.contains(*a)), "{cidr}");
        }
    }

    #[test]
    fn test_addresses_follow_next() {
        let r = range("192.168.7.0/28");
        let mut current = r.start();
        let mut walked = vec![current];
        while let Ok(next) = r.next(current) {
            walked.push(next);
            current = next;
        }
        assert_eq!(walked, r.addresses().collect::<Vec<_>>());
    }

    #[test]
    fn test_addresses_double_ended_and_exact() {
        let r = range("10.0.0.0/30");
        let mut it = r.addresses();
        assert_eq!(it.len(), 4);
        assert_eq!(it.next_back(), Some(Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(it.next(), Some(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(it.len(), 2);
        assert_eq!(it.next(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(it.next_back(), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(it.next(), None);
        assert_eq!(it.next_back(), None);
    }

    #[test]
    fn test_whole_space_len() {
        let r = range("0.0.0.0/0");
        assert_eq!(r.len(), 1u64 << 32);
        assert_eq!(r.start(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(r.finish(), Ipv4Addr::BROADCAST);
        assert_eq!(r.addresses().next_back(), Some(Ipv4Addr::BROADCAST));
    }

    #[test]
    fn test_from_parts() {
        let r = AddressRange::from_parts(Ipv4Addr::new(10, 8, 0, 1), 24).unwrap();
        assert_eq!(r.start(), Ipv4Addr::new(10, 8, 0, 0));
        assert_eq!(r.netmask(), Ipv4Addr::new(255, 255, 255, 0));
        assert!(AddressRange::from_parts(Ipv4Addr::new(10, 8, 0, 1), 33).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!("10.0.0.0".parse::<AddressRange>().is_err());
        assert!("10.0.0.0/40".parse::<AddressRange>().is_err());
        assert!("fd00::/64".parse::<AddressRange>().is_err());
        assert!(matches!(
            "nonsense".parse::<AddressRange>(),
            Err(CoreError::InvalidNetwork { .. })
        ));
    }
}
