// ============================================
// File: crates/tunnelscope-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! Capture timestamps are carried as microseconds since the Unix epoch,
//! which is what packet consumers (JSON lines, pcap writers) expect.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Point in time at which a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureTimestamp(u64);

impl CaptureTimestamp {
    /// Creates a timestamp from microseconds since the Unix epoch.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Returns microseconds since the Unix epoch.
    #[must_use]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Returns whole seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Returns the sub-second part in microseconds.
    #[must_use]
    pub const fn subsec_micros(&self) -> u32 {
        // Always < 1_000_000
        #[allow(clippy::cast_possible_truncation)]
        let micros = (self.0 % 1_000_000) as u32;
        micros
    }
}

impl From<SystemTime> for CaptureTimestamp {
    fn from(time: SystemTime) -> Self {
        // Clocks set before 1970 collapse to the epoch
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        Self(u64::try_from(since_epoch.as_micros()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_system_time() {
        let time = UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456);
        let ts = CaptureTimestamp::from(time);

        assert_eq!(ts.as_micros(), 1_700_000_000_123_456);
        assert_eq!(ts.as_secs(), 1_700_000_000);
        assert_eq!(ts.subsec_micros(), 123_456);
    }

    #[test]
    fn test_before_epoch_clamps() {
        let time = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(CaptureTimestamp::from(time).as_micros(), 0);
    }

    #[test]
    fn test_now_is_ordered() {
        let a = CaptureTimestamp::now();
        let b = CaptureTimestamp::now();
        assert!(b >= a);
    }
}
