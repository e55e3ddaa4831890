// ============================================
// File: crates/tunnelscope-server/src/services/registry.rs
// ============================================
//! # Subscriber Registry
//!
//! ## Creation Reason
//! Maps device IPs to the subscribers watching them, and subscriber ids
//! to their delivery channels, so the capture thread can find every
//! recipient of a packet with two hash lookups.
//!
//! ## Registry Structure
//! ```text
//! ┌───────────────────────────────┐   ┌───────────────────────────────┐
//! │            by_ip              │   │           channels            │
//! ├──────────────┬────────────────┤   ├──────────────┬────────────────┤
//! │  10.0.0.2    │ {a1.., 7f..}   │   │  a1..        │ (10.0.0.2, tx) │
//! │  10.0.0.3    │ {c4..}         │   │  7f..        │ (10.0.0.2, tx) │
//! └──────────────┴────────────────┘   │  c4..        │ (10.0.0.3, tx) │
//!                                     └──────────────┴────────────────┘
//! ```
//!
//! ## Invariants
//! - An id is in some `by_ip` set iff it has an entry in `channels`
//! - An id watches exactly one IP
//! - No empty sets are kept in `by_ip`
//! - Once closed, the registry stays empty
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both maps sit behind ONE lock and must be mutated together
//! - `dispatch` runs on the capture thread under the read lock; it must
//!   never block, so delivery is `try_send` only
//!
//! ## Last Modified
//! v0.1.0 - Initial registry

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use tunnelscope_common::SubscriberId;
use tunnelscope_core::{Flow, PacketRecord};

/// Receiving end of a subscription. Yields `None` once unsubscribed.
pub type PacketReceiver = mpsc::Receiver<Arc<PacketRecord>>;

type PacketSender = mpsc::Sender<Arc<PacketRecord>>;

// ============================================
// Delivery
// ============================================

/// Result of dispatching one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that matched the flow.
    pub recipients: usize,
    /// Records queued.
    pub delivered: usize,
    /// Records dropped on a full channel.
    pub overflowed: usize,
    /// Subscribers found with a dropped receiver and removed.
    pub closed: usize,
}

// ============================================
// SubscriberRegistry
// ============================================

#[derive(Debug)]
struct Subscription {
    ip: Ipv4Addr,
    sender: PacketSender,
}

#[derive(Debug, Default)]
struct Maps {
    by_ip: HashMap<Ipv4Addr, HashSet<SubscriberId>>,
    channels: HashMap<SubscriberId, Subscription>,
    closed: bool,
}

impl Maps {
    fn detach(&mut self, id: &SubscriberId) -> Option<Subscription> {
        let subscription = self.channels.remove(id)?;
        if let Some(set) = self.by_ip.get_mut(&subscription.ip) {
            set.remove(id);
            if set.is_empty() {
                self.by_ip.remove(&subscription.ip);
            }
        }
        Some(subscription)
    }
}

/// IP → subscriber registry with per-subscriber bounded channels.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    maps: RwLock<Maps>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` for packets to or from `ip`.
    ///
    /// An id that is already registered is moved to `ip`; its previous
    /// receiver is closed. After [`close_all`](Self::close_all) the
    /// returned receiver is already closed.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn subscribe(&self, ip: Ipv4Addr, id: SubscriberId, capacity: usize) -> PacketReceiver {
        let (sender, receiver) = mpsc::channel(capacity);

        let mut maps = self.maps.write();
        if maps.closed {
            debug!(ip = %ip, subscriber = %id, "Registry closed, subscription refused");
            return receiver;
        }
        let previous = maps.detach(&id);
        maps.by_ip.entry(ip).or_default().insert(id);
        maps.channels.insert(id, Subscription { ip, sender });
        drop(maps);

        match previous {
            Some(old) => debug!(
                ip = %ip,
                previous_ip = %old.ip,
                subscriber = %id,
                "Subscription replaced"
            ),
            None => debug!(ip = %ip, subscriber = %id, "Subscribed"),
        }

        receiver
    }

    /// Removes `id` from `ip` and closes its channel.
    ///
    /// Returns `false` (and changes nothing) if `id` is not registered
    /// on `ip`.
    pub fn unsubscribe(&self, ip: Ipv4Addr, id: &SubscriberId) -> bool {
        let mut maps = self.maps.write();
        if maps.channels.get(id).map(|s| s.ip) != Some(ip) {
            return false;
        }
        let removed = maps.detach(id).is_some();
        drop(maps);

        debug!(ip = %ip, subscriber = %id, "Unsubscribed");
        removed
    }

    /// Sends one shared record to every subscriber of `flow.src` or
    /// `flow.dst`.
    ///
    /// `make_record` runs at most once, and only when someone matched.
    /// Returns `None` when nobody matched. Subscribers whose receiver was
    /// dropped without unsubscribing are removed afterwards.
    pub fn dispatch<F>(&self, flow: Flow, make_record: F) -> Option<Delivery>
    where
        F: FnOnce() -> PacketRecord,
    {
        let mut closed = Vec::new();
        let delivery = self.offer(flow, make_record, &mut closed)?;

        if !closed.is_empty() {
            self.prune(&closed);
        }
        Some(Delivery {
            closed: closed.len(),
            ..delivery
        })
    }

    fn offer<F>(&self, flow: Flow, make_record: F, closed: &mut Vec<SubscriberId>) -> Option<Delivery>
    where
        F: FnOnce() -> PacketRecord,
    {
        let maps = self.maps.read();

        let src = maps.by_ip.get(&flow.src);
        // An id watches one IP, so the two sets only overlap when src == dst
        let dst = if flow.dst == flow.src {
            None
        } else {
            maps.by_ip.get(&flow.dst)
        };

        if src.is_none() && dst.is_none() {
            return None;
        }

        let record = Arc::new(make_record());
        let mut delivery = Delivery::default();

        for id in src.into_iter().chain(dst).flatten() {
            let Some(subscription) = maps.channels.get(id) else {
                continue;
            };
            delivery.recipients += 1;
            match subscription.sender.try_send(Arc::clone(&record)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => delivery.overflowed += 1,
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        Some(delivery)
    }

    /// Detaches ids whose receiver is gone.
    fn prune(&self, ids: &[SubscriberId]) {
        let mut maps = self.maps.write();
        for id in ids {
            // The id may have been re-subscribed since the read pass
            let stale = maps
                .channels
                .get(id)
                .is_some_and(|subscription| subscription.sender.is_closed());
            if stale {
                let ip = maps.detach(id).map(|subscription| subscription.ip);
                if let Some(ip) = ip {
                    debug!(ip = %ip, subscriber = %id, "Dropped receiver pruned");
                }
            }
        }
    }

    /// Removes every subscriber, closes all receivers and refuses any
    /// later subscription.
    ///
    /// Returns the number of subscriptions closed.
    pub fn close_all(&self) -> usize {
        let mut maps = self.maps.write();
        maps.closed = true;
        let closed = maps.channels.len();
        maps.channels.clear();
        maps.by_ip.clear();
        closed
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn is_subscribed(&self, id: &SubscriberId) -> bool {
        self.maps.read().channels.contains_key(id)
    }

    /// Returns the number of subscribers watching `ip`.
    #[must_use]
    pub fn subscribers_of(&self, ip: Ipv4Addr) -> usize {
        self.maps.read().by_ip.get(&ip).map_or(0, HashSet::len)
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.maps.read().channels.len()
    }

    /// Returns the number of watched IPs.
    #[must_use]
    pub fn watched_ips(&self) -> usize {
        self.maps.read().by_ip.len()
    }

    /// Returns `true` if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.read().channels.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let maps = self.maps.read();
        let mut members = 0;
        for (ip, set) in &maps.by_ip {
            assert!(!set.is_empty(), "empty set kept for {ip}");
            for id in set {
                let subscription = maps.channels.get(id).expect("member without channel");
                assert_eq!(subscription.ip, *ip);
                members += 1;
            }
        }
        assert_eq!(members, maps.channels.len(), "channel without membership");
    }
}

// ============================================
// Tests
// ============================================
