// ============================================
// File: crates/tunnelscope-core/src/addressing/pool.rs
// ============================================
//! # Reservable Address Pool
//!
//! ## Creation Reason
//! `AddressRange` enumerates every address of the block. Deciding which
//! of them may be leased to devices is a separate policy, kept here so
//! that pool initialization and lease allocation apply the same rule.
//!
//! ## Exclusion Policy
//! - The network address (`start()`) is never reservable
//! - The broadcast address (`finish()`) is never reservable
//! - Explicitly reserved addresses (the VPN server's own address) are
//!   never reservable
//!
//! For a /24 with the server on `.1`: 256 - 2 - 1 = 253 leasable addresses.
//! A /31 or /32 block has no leasable addresses under this policy.
//!
//! ## Last Modified
//! v0.1.0 - Initial pool policy

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::addressing::AddressRange;
use crate::error::{CoreError, Result};

/// The leasable subset of an [`AddressRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPool {
    range: AddressRange,
    reserved: BTreeSet<Ipv4Addr>,
}

impl AddressPool {
    /// Creates a pool over `range` with no extra reservations.
    #[must_use]
    pub fn new(range: AddressRange) -> Self {
        Self {
            range,
            reserved: BTreeSet::new(),
        }
    }

    /// Reserves `address` so it is never handed out.
    ///
    /// # Errors
    /// - `AddressNotInRange` if `address` is outside the block
    /// - `AddressReserved` if it is the network or broadcast address
    pub fn with_reserved(mut self, address: Ipv4Addr) -> Result<Self> {
        if !self.range.contains(address) {
            return Err(CoreError::AddressNotInRange {
                address,
                network: self.range.network(),
            });
        }
        if address == self.range.start() || address == self.range.finish() {
            return Err(CoreError::AddressReserved {
                address,
                network: self.range.network(),
            });
        }
        self.reserved.insert(address);
        Ok(self)
    }

    /// Returns the underlying range.
    #[must_use]
    pub const fn range(&self) -> &AddressRange {
        &self.range
    }

    /// Returns the explicitly reserved addresses.
    pub fn reserved(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.reserved.iter().copied()
    }

    /// Returns `true` if `address` may be leased to a device.
    #[must_use]
    pub fn is_reservable(&self, address: Ipv4Addr) -> bool {
        self.range.contains(address)
            && address != self.range.start()
            && address != self.range.finish()
            && !self.reserved.contains(&address)
    }

    /// Returns the leasable addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.range
            .addresses()
            .filter(move |address| self.is_reservable(*address))
    }

    /// Returns the number of leasable addresses.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        // start == finish for a /32, which then only excludes one address
        let boundaries = if self.range.len() == 1 { 1 } else { 2 };
        self.range.len() - boundaries - self.reserved.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(cidr: &str) -> AddressPool {
        AddressPool::new(cidr.parse().unwrap())
    }

    #[test]
    fn test_excludes_network_and_broadcast() {
        let pool = pool("10.0.0.0/24");
        let all: Vec<Ipv4Addr> = pool.iter().collect();

        assert_eq!(all.len(), 254);
        assert_eq!(pool.capacity(), 254);
        assert_eq!(all.first(), Some(&Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(all.last(), Some(&Ipv4Addr::new(10, 0, 0, 254)));
        assert!(!pool.is_reservable(Ipv4Addr::new(10, 0, 0, 0)));
        assert!(!pool.is_reservable(Ipv4Addr::new(10, 0, 0, 255)));
    }

    #[test]
    fn test_server_address_reserved() {
        let pool = pool("10.0.0.0/24")
            .with_reserved(Ipv4Addr::new(10, 0, 0, 1))
            .unwrap();

        assert_eq!(pool.capacity(), 253);
        assert_eq!(pool.iter().count(), 253);
        assert_eq!(pool.iter().next(), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(pool.reserved().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 1)]);
    }

    #[test]
    fn test_reserve_invalid_addresses() {
        assert!(matches!(
            pool("10.0.0.0/24").with_reserved(Ipv4Addr::new(10, 0, 1, 1)),
            Err(CoreError::AddressNotInRange { .. })
        ));
        assert!(matches!(
            pool("10.0.0.0/24").with_reserved(Ipv4Addr::new(10, 0, 0, 255)),
            Err(CoreError::AddressReserved { .. })
        ));
    }

    #[test]
    fn test_tiny_blocks_have_no_leases() {
        for cidr in ["10.0.0.4/31", "10.0.0.4/32"] {
            let pool = pool(cidr);
            assert_eq!(pool.iter().count(), 0, "{cidr}");
            assert_eq!(pool.capacity(), 0, "{cidr}");
        }
    }

    #[test]
    fn test_slash_30() {
        let pool = pool("100.64.0.0/30");
        assert_eq!(
            pool.iter().collect::<Vec<_>>(),
            vec![Ipv4Addr::new(100, 64, 0, 1), Ipv4Addr::new(100, 64, 0, 2)]
        );
    }
}
