// ============================================
// File: crates/tunnelscope-server/src/services/lease.rs
// ============================================
//! # Lease Service
//!
//! ## Creation Reason
//! Hands out device addresses from the configured block, one after the
//! other, remembering only the last address assigned.
//!
//! ## Main Functionality
//! - `LeaseService`: Sequential allocator over an `AddressPool`
//! - Pool listing for one-time initialization of the lease table
//! - Resuming from a persisted "last assigned" value
//!
//! ## Allocation Strategy
//! ```text
//! 10.0.0.0/24, server 10.0.0.1
//!
//!  .0      .1      .2      .3     ...    .254    .255
//!  net   server  first   second         last   broadcast
//!   ✗       ✗       ✓       ✓              ✓       ✗
//! ```
//! - Successor of the last assigned address via `AddressRange::next`
//! - Reserved addresses are skipped
//! - Reaching the broadcast address means the block is exhausted
//! - Never wraps around; released addresses are not reused here
//!
//! ## Example
//! ```
//! use tunnelscope_core::AddressPool;
//! use tunnelscope_server::services::LeaseService;
//! use std::net::Ipv4Addr;
//!
//! let pool = AddressPool::new("10.0.0.0/24".parse().unwrap())
//!     .with_reserved(Ipv4Addr::new(10, 0, 0, 1))
//!     .unwrap();
//! let leases = LeaseService::new(pool);
//!
//! assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 2));
//! assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 3));
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The mutex is the only thing serializing read-modify-write of the
//!   last assigned address; callers must not cache it
//! - Persisting leases is the caller's job; call `resume_from` on start
//!
//! ## Last Modified
//! v0.1.0 - Initial lease service

use std::net::Ipv4Addr;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tunnelscope_core::{AddressPool, AddressRange, CoreError};

use crate::error::Result;

// ============================================
// LeaseService
// ============================================

/// Sequential address leasing.
///
/// # Thread Safety
/// Uses internal locking for thread-safe operations.
///
/// # Capacity
/// For a /24 network: 254 addresses (256 - network - broadcast)
/// Minus the server address: 253 leasable addresses
#[derive(Debug)]
pub struct LeaseService {
    /// Leasable subset of the block
    pool: AddressPool,
    /// Last address handed out
    last_assigned: Mutex<Option<Ipv4Addr>>,
}

impl LeaseService {
    /// Creates a lease service that starts at the bottom of the block.
    #[must_use]
    pub fn new(pool: AddressPool) -> Self {
        info!(
            subnet = %pool.range(),
            capacity = pool.capacity(),
            "Lease service initialized"
        );

        Self {
            pool,
            last_assigned: Mutex::new(None),
        }
    }

    /// Returns the address block.
    #[must_use]
    pub fn range(&self) -> &AddressRange {
        self.pool.range()
    }

    /// Returns every leasable address in ascending order.
    #[must_use]
    pub fn reservable(&self) -> Vec<Ipv4Addr> {
        self.pool.iter().collect()
    }

    /// Returns the number of leasable addresses.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.pool.capacity()
    }

    /// Returns the last address handed out.
    #[must_use]
    pub fn last_assigned(&self) -> Option<Ipv4Addr> {
        *self.last_assigned.lock()
    }

    /// Continues allocation after `last`.
    ///
    /// # Errors
    /// Returns `AddressNotInRange` if `last` is outside the block.
    pub fn resume_from(&self, last: Ipv4Addr) -> Result<()> {
        let range = self.pool.range();
        if !range.contains(last) {
            return Err(CoreError::AddressNotInRange {
                address: last,
                network: range.network(),
            }
            .into());
        }

        *self.last_assigned.lock() = Some(last);
        debug!(last = %last, "Lease allocation resumed");
        Ok(())
    }

    /// Allocates the next leasable address.
    ///
    /// # Errors
    /// Returns `AddressesExhausted` once the broadcast address is reached.
    pub fn allocate(&self) -> Result<Ipv4Addr> {
        let range = self.pool.range();
        let mut last = self.last_assigned.lock();

        let mut candidate = last.unwrap_or_else(|| range.start());
        loop {
            candidate = range.next(candidate)?;

            if candidate == range.finish() {
                warn!(subnet = %range, "Address block exhausted");
                return Err(CoreError::AddressesExhausted {
                    network: range.network(),
                }
                .into());
            }

            if self.pool.is_reservable(candidate) {
                *last = Some(candidate);
                debug!(address = %candidate, "Address leased");
                return Ok(candidate);
            }
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;

    fn service(cidr: &str, server: Option<Ipv4Addr>) -> LeaseService {
        let mut pool = AddressPool::new(cidr.parse().unwrap());
        if let Some(address) = server {
            pool = pool.with_reserved(address).unwrap();
        }
        LeaseService::new(pool)
    }

    fn is_exhausted(err: &ServerError) -> bool {
        matches!(err, ServerError::Core(e) if e.is_exhausted())
    }

    #[test]
    fn test_sequential_allocation_skips_server() {
        let leases = service("10.0.0.0/24", Some(Ipv4Addr::new(10, 0, 0, 1)));

        assert_eq!(leases.capacity(), 253);
        assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(leases.last_assigned(), Some(Ipv4Addr::new(10, 0, 0, 3)));
    }

    #[test]
    fn test_server_in_middle_is_skipped() {
        let leases = service("10.0.0.0/29", Some(Ipv4Addr::new(10, 0, 0, 3)));

        let all: Vec<_> = std::iter::from_fn(|| leases.allocate().ok()).collect();
        assert_eq!(
            all,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 4),
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 6),
            ]
        );
        assert_eq!(all, leases.reservable());
    }

    #[test]
    fn test_exhaustion_never_wraps() {
        let leases = service("10.0.0.0/30", None);

        assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 2));
        assert!(is_exhausted(&leases.allocate().unwrap_err()));
        assert!(is_exhausted(&leases.allocate().unwrap_err()));
        assert_eq!(leases.last_assigned(), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_tiny_blocks_have_nothing_to_lease() {
        for cidr in ["10.0.0.0/31", "10.0.0.7/32"] {
            let leases = service(cidr, None);
            assert_eq!(leases.capacity(), 0);
            assert!(leases.reservable().is_empty());
            assert!(is_exhausted(&leases.allocate().unwrap_err()));
        }
    }

    #[test]
    fn test_resume_from() {
        let leases = service("10.0.0.0/24", Some(Ipv4Addr::new(10, 0, 0, 1)));
        leases.resume_from(Ipv4Addr::new(10, 0, 0, 100)).unwrap();
        assert_eq!(leases.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 101));

        leases.resume_from(Ipv4Addr::new(10, 0, 0, 254)).unwrap();
        assert!(is_exhausted(&leases.allocate().unwrap_err()));
    }

    #[test]
    fn test_resume_from_outside_block() {
        let leases = service("10.0.0.0/24", None);
        let err = leases.resume_from(Ipv4Addr::new(10, 0, 1, 1)).unwrap_err();
        assert!(err.is_allocation_error());
        assert_eq!(leases.last_assigned(), None);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let leases = Arc::new(service("10.1.0.0/22", Some(Ipv4Addr::new(10, 1, 0, 1))));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let leases = Arc::clone(&leases);
                std::thread::spawn(move || {
                    (0..200).map(|_| leases.allocate().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for address in handle.join().unwrap() {
                assert!(seen.insert(address), "{address} leased twice");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
