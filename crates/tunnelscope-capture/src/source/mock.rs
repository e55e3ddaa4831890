// ============================================
// File: crates/tunnelscope-capture/src/source/mock.rs
// ============================================
//! # Mock Frame Source
//!
//! ## Creation Reason
//! Lets the capture loop and the observer be tested without an
//! interface or `CAP_NET_RAW`.
//!
//! ## Main Functionality
//! - In-memory frame queue fed from any thread
//! - Honors the read timeout like a real socket
//! - `close()` ends the stream once the queue drains
//!
//! ## Usage in Tests
//! ```ignore
//! use std::time::Duration;
//! use tunnelscope_capture::{CaptureConfig, FrameSource, MockSource};
//! use tunnelscope_common::LinkType;
//!
//! let handle = MockSource::new(CaptureConfig::new("mock0"), LinkType::RawIp);
//! let mut source = handle.clone();
//!
//! handle.inject_frame(vec![0x45; 40]);
//! handle.close();
//!
//! let mut buf = [0u8; 1024];
//! let frame = source.next_frame(&mut buf).unwrap().unwrap();
//! assert_eq!(frame.len, 40);
//! assert!(source.next_frame(&mut buf).is_err());
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Clones share one queue; keep a clone as the injection handle
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use tunnelscope_common::time::CaptureTimestamp;
use tunnelscope_common::LinkType;

use crate::error::{CaptureError, Result};
use crate::traits::{CaptureConfig, CapturedFrame, FrameSource};

// ============================================
// Constants
// ============================================

/// Maximum number of frames to queue.
const MAX_QUEUE_SIZE: usize = 10_000;

// ============================================
// MockSource
// ============================================

#[derive(Debug, Default)]
struct Queue {
    frames: VecDeque<Vec<u8>>,
    closed: bool,
    delivered: u64,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// In-memory frame source for testing.
#[derive(Debug, Clone)]
pub struct MockSource {
    /// Session configuration
    config: CaptureConfig,
    /// Framing reported to the decoder
    link_type: LinkType,
    /// Queue shared by all clones
    shared: Arc<Shared>,
}

impl MockSource {
    /// Creates an empty mock source.
    #[must_use]
    pub fn new(config: CaptureConfig, link_type: LinkType) -> Self {
        Self {
            config,
            link_type,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Queues a frame for the next `next_frame()` call.
    ///
    /// # Panics
    /// Panics if the queue is full (> `MAX_QUEUE_SIZE` frames).
    pub fn inject_frame(&self, frame: Vec<u8>) {
        let mut queue = self.shared.queue.lock();
        assert!(queue.frames.len() < MAX_QUEUE_SIZE, "Mock source queue overflow");
        queue.frames.push_back(frame);
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Queues several frames at once.
    ///
    /// # Panics
    /// Panics if the queue overflows.
    pub fn inject_frames(&self, frames: impl IntoIterator<Item = Vec<u8>>) {
        let mut queue = self.shared.queue.lock();
        for frame in frames {
            assert!(queue.frames.len() < MAX_QUEUE_SIZE, "Mock source queue overflow");
            queue.frames.push_back(frame);
        }
        drop(queue);
        self.shared.available.notify_all();
    }

    /// Ends the stream after the queued frames are read.
    pub fn close(&self) {
        self.shared.queue.lock().closed = true;
        self.shared.available.notify_all();
    }

    /// Returns the number of frames handed out so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.shared.queue.lock().delivered
    }
}

impl FrameSource for MockSource {
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<CapturedFrame>> {
        let mut queue = self.shared.queue.lock();

        loop {
            if let Some(frame) = queue.frames.pop_front() {
                queue.delivered += 1;
                drop(queue);

                let len = frame.len().min(buf.len()).min(self.config.snapshot_len);
                buf[..len].copy_from_slice(&frame[..len]);
                return Ok(Some(CapturedFrame {
                    len,
                    original_len: frame.len(),
                    timestamp: CaptureTimestamp::now(),
                }));
            }

            if queue.closed {
                return Err(CaptureError::Closed);
            }

            let waited = self
                .shared
                .available
                .wait_for(&mut queue, self.config.read_timeout);
            if waited.timed_out() && queue.frames.is_empty() && !queue.closed {
                return Ok(None);
            }
        }
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn device(&self) -> &str {
        &self.config.device
    }

    fn snapshot_len(&self) -> usize {
        self.config.snapshot_len
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn source() -> MockSource {
        MockSource::new(
            CaptureConfig::new("mock0").with_read_timeout(Duration::from_millis(20)),
            LinkType::RawIp,
        )
    }

    #[test]
    fn test_frames_in_order() {
        let mut source = source();
        source.inject_frames(vec![vec![1; 80], vec![2; 90]]);

        let mut buf = [0u8; 1024];
        let first = source.next_frame(&mut buf).unwrap().unwrap();
        assert_eq!(first.len, 80);
        assert_eq!(buf[0], 1);

        let second = source.next_frame(&mut buf).unwrap().unwrap();
        assert_eq!(second.len, 90);
        assert_eq!(buf[0], 2);
        assert_eq!(source.delivered(), 2);
    }

    #[test]
    fn test_timeout_returns_none() {
        let mut source = source();
        let mut buf = [0u8; 128];
        assert!(source.next_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_snapshot_truncation() {
        let mut source = MockSource::new(
            CaptureConfig::new("mock0").with_snapshot_len(100),
            LinkType::RawIp,
        );
        source.inject_frame(vec![7; 1500]);

        let mut buf = [0u8; 2048];
        let frame = source.next_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.len, 100);
        assert_eq!(frame.original_len, 1500);
        assert!(frame.is_truncated());
    }

    #[test]
    fn test_close_drains_then_ends() {
        let mut source = source();
        source.inject_frame(vec![0; 64]);
        source.close();

        let mut buf = [0u8; 128];
        assert!(source.next_frame(&mut buf).unwrap().is_some());
        assert!(matches!(source.next_frame(&mut buf), Err(CaptureError::Closed)));
    }

    #[test]
    fn test_inject_from_other_thread() {
        let handle = MockSource::new(
            CaptureConfig::new("mock0").with_read_timeout(Duration::from_secs(5)),
            LinkType::Ethernet,
        );
        let mut source = handle.clone();

        let injector = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.inject_frame(vec![9; 60]);
        });

        let mut buf = [0u8; 128];
        let frame = source.next_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.len, 60);
        assert_eq!(source.link_type(), LinkType::Ethernet);
        injector.join().unwrap();
    }
}
