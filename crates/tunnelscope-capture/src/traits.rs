// ============================================
// File: crates/tunnelscope-capture/src/traits.rs
// ============================================
//! # Capture Traits
//!
//! ## Creation Reason
//! Defines the interface between the capture loop and whatever produces
//! frames, so the loop can be exercised without a live interface.
//!
//! ## Main Functionality
//! - `FrameSource`: Blocking, one-frame-at-a-time reader
//! - `CaptureConfig`: Interface name, snapshot length, read timeout
//! - `CapturedFrame`: Metadata of one read
//!
//! ## ⚠️ Important Note for Next Developer
//! - `next_frame` blocks for at most the read timeout
//! - The caller owns the buffer and reuses it for every frame
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::time::Duration;

use tunnelscope_common::time::CaptureTimestamp;
use tunnelscope_common::LinkType;

use crate::error::{CaptureError, Result};

// ============================================
// Constants
// ============================================

/// Default number of bytes kept from each frame.
pub const DEFAULT_SNAPSHOT_LEN: usize = 1024;

/// Default time a read waits before returning without a frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Smallest accepted snapshot length.
pub const MIN_SNAPSHOT_LEN: usize = 64;

/// Largest snapshot length.
pub const MAX_SNAPSHOT_LEN: usize = 65_535;

/// Linux interface names are limited to 15 bytes.
const MAX_DEVICE_NAME_LEN: usize = 15;

// ============================================
// CapturedFrame
// ============================================

/// Metadata about one frame written into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Bytes written into the buffer.
    pub len: usize,
    /// Length of the frame on the wire.
    pub original_len: usize,
    /// When the frame was read.
    pub timestamp: CaptureTimestamp,
}

impl CapturedFrame {
    /// Returns `true` if the frame did not fit the buffer.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.len < self.original_len
    }
}

// ============================================
// FrameSource Trait
// ============================================

/// A blocking producer of link-layer frames.
///
/// # Example
/// ```ignore
/// fn drain<S: FrameSource>(source: &mut S) -> Result<()> {
///     let mut buf = vec![0u8; source.snapshot_len()];
///     loop {
///         if let Some(frame) = source.next_frame(&mut buf)? {
///             process(&buf[..frame.len]);
///         }
///     }
/// }
/// ```
pub trait FrameSource: Send {
    /// Reads the next frame into `buf`.
    ///
    /// # Returns
    /// - `Ok(Some(frame))` with `buf[..frame.len]` filled
    /// - `Ok(None)` if the read timeout elapsed
    ///
    /// # Errors
    /// `Closed` once the source is exhausted, or a read failure.
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<CapturedFrame>>;

    /// Returns the framing of produced frames.
    fn link_type(&self) -> LinkType;

    /// Returns the interface name.
    fn device(&self) -> &str;

    /// Returns the number of bytes kept from each frame.
    fn snapshot_len(&self) -> usize;
}

// ============================================
// CaptureConfig
// ============================================

/// Configuration of a capture session.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tunnelscope_capture::CaptureConfig;
///
/// let config = CaptureConfig::new("wg0")
///     .with_snapshot_len(256)
///     .with_read_timeout(Duration::from_secs(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Interface name (e.g., "wg0").
    pub device: String,
    /// Bytes kept from each frame.
    pub snapshot_len: usize,
    /// Maximum time one read blocks.
    pub read_timeout: Duration,
    /// Whether to put the interface in promiscuous mode.
    pub promiscuous: bool,
}

impl CaptureConfig {
    /// Creates a non-promiscuous configuration with defaults.
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            snapshot_len: DEFAULT_SNAPSHOT_LEN,
            read_timeout: DEFAULT_READ_TIMEOUT,
            promiscuous: false,
        }
    }

    /// Sets the snapshot length.
    #[must_use]
    pub const fn with_snapshot_len(mut self, snapshot_len: usize) -> Self {
        self.snapshot_len = snapshot_len;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets promiscuous mode.
    #[must_use]
    pub const fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(CaptureError::invalid_config(
                "device",
                "device name cannot be empty",
            ));
        }

        if self.device.len() > MAX_DEVICE_NAME_LEN {
            return Err(CaptureError::invalid_config(
                "device",
                "device name cannot exceed 15 characters",
            ));
        }

        if !(MIN_SNAPSHOT_LEN..=MAX_SNAPSHOT_LEN).contains(&self.snapshot_len) {
            return Err(CaptureError::invalid_config(
                "snapshot_len",
                format!("must be between {MIN_SNAPSHOT_LEN} and {MAX_SNAPSHOT_LEN}"),
            ));
        }

        if self.read_timeout.is_zero() {
            return Err(CaptureError::invalid_config(
                "read_timeout",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new("wg0")
    }
}

// ============================================
// Tests
// ============================================
