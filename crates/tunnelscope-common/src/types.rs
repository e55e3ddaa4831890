// ============================================
// File: crates/tunnelscope-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers and enums shared between the capture
//! layer and the traffic observer.
//!
//! ## Main Functionality
//! - `SubscriberId`: Opaque identifier for one live traffic feed (16 bytes)
//! - `LinkType`: Link-layer framing of a capture source
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SubscriberId` is used as a hashmap key on the dispatch path; keep it `Copy`
//! - Display/parse format is URL-safe base64 so ids can travel in query strings
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of `SubscriberId` in bytes.
pub const SUBSCRIBER_ID_SIZE: usize = 16;

// ============================================
// SubscriberId
// ============================================

/// Identifier of one subscription to the traffic observer.
///
/// Callers normally mint a fresh id per streaming connection with
/// [`SubscriberId::generate`]. Reusing an id that is still subscribed
/// replaces the previous subscription.
///
/// # Example
/// ```
/// use tunnelscope_common::types::SubscriberId;
///
/// let id = SubscriberId::generate();
/// let parsed: SubscriberId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId([u8; SUBSCRIBER_ID_SIZE]);

impl SubscriberId {
    /// Creates a `SubscriberId` from raw bytes.
    ///
    /// Returns `None` unless `bytes` is exactly 16 bytes long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let id: [u8; SUBSCRIBER_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(id))
    }

    /// Generates a new random `SubscriberId`.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; SUBSCRIBER_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }

    /// Returns the raw bytes of the id.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SUBSCRIBER_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubscriberId({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl FromStr for SubscriberId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| CommonError::decoding("subscriber id", e.to_string()))?;

        Self::from_bytes(&bytes)
            .ok_or_else(|| CommonError::invalid_length(SUBSCRIBER_ID_SIZE, bytes.len()))
    }
}

impl Serialize for SubscriberId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubscriberId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// LinkType
// ============================================

/// Link-layer framing of frames delivered by a capture source.
///
/// Live packet sockets deliver bare IP packets; recorded traffic and
/// test sources may carry Ethernet frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Ethernet II framing (14-byte header).
    Ethernet,
    /// No link header, the frame starts with the IP header.
    RawIp,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethernet => write!(f, "ethernet"),
            Self::RawIp => write!(f, "raw-ip"),
        }
    }
}

// ============================================
// Tests
// ============================================
