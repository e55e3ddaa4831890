// ============================================
// File: crates/tunnelscope-server/src/services/observer.rs
// ============================================
//! # Traffic Observer
//!
//! ## Creation Reason
//! Taps the VPN interface and streams each device's decrypted traffic
//! to whoever subscribed to that device's IP.
//!
//! ## Main Functionality
//! - `subscribe` / `unsubscribe` by (IP, subscriber id)
//! - `start_capture`: opens the interface and runs the capture loop on a
//!   dedicated thread
//! - `run_capture`: the loop itself, over any `FrameSource`
//! - `CaptureHandle`: awaitable exit of the capture thread
//! - `ObserverStats` for the periodic stats log
//!
//! ## Lifecycle
//! ```text
//!   Idle ──start_capture()──► Capturing ──stop() / source closed / read error──► Ended
//!                               │                                               │
//!                               └─ per frame: Decode → Classify → Dispatch      └─ all streams closed
//! ```
//!
//! ## Usage
//! ```ignore
//! let observer = Arc::new(TrafficObserver::new("wg0", 256));
//! let mut capture = observer.start_capture(config.capture_config())?;
//!
//! let id = SubscriberId::generate();
//! let mut packets = observer.subscribe(device_ip, id);
//! while let Some(record) = packets.recv().await {
//!     forward(&record);
//! }
//! // `None`: unsubscribed, or the capture loop ended
//! capture.exited().await;
//! capture.join()?;
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The capture thread blocks in the kernel for up to the read timeout;
//!   `stop()` takes effect after the current read returns
//! - A failed open is returned once and is not retried
//! - Only interrupted reads are retried. Any other read error (`ENETDOWN`,
//!   `ENXIO` when the interface is deleted) ends the loop: the socket is
//!   bound to an interface index that a recreated interface does not
//!   reuse. The supervisor restarts the process with a fresh socket.
//! - When the loop ends for any reason, even a panic, every subscriber
//!   stream is closed and later subscriptions are refused
//! - Slow subscribers lose their newest packets, never the capture loop
//!
//! ## Last Modified
//! v0.1.0 - Initial traffic observer

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;
use tracing::{debug, error, info};

use tunnelscope_capture::{CaptureConfig, CaptureError, FrameSource};
use tunnelscope_common::SubscriberId;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::handlers::FrameHandler;
use crate::services::registry::{PacketReceiver, SubscriberRegistry};
use crate::services::stats::ObserverStats;

/// Name of the capture thread.
const CAPTURE_THREAD_NAME: &str = "tunnelscope-capture";

const STATE_IDLE: u8 = 0;
const STATE_CAPTURING: u8 = 1;
const STATE_ENDED: u8 = 2;

// ============================================
// CaptureHandle
// ============================================

/// Handle to the capture thread.
///
/// Dropping it detaches the thread; it does not stop the loop.
#[derive(Debug)]
pub struct CaptureHandle {
    thread: JoinHandle<tunnelscope_capture::Result<()>>,
    exit_rx: oneshot::Receiver<()>,
    exited: bool,
}

impl CaptureHandle {
    /// Completes once the capture thread has returned or panicked.
    ///
    /// Cancel safe, and returns immediately on later calls.
    pub async fn exited(&mut self) {
        if !self.exited {
            // Err means the sender was dropped during a panic
            let _ = (&mut self.exit_rx).await;
            self.exited = true;
        }
    }

    /// Waits for the capture thread and returns the loop's exit status.
    ///
    /// Blocks the calling thread until the loop returns; call after
    /// [`exited`](Self::exited) from async code.
    ///
    /// # Errors
    /// - `Capture(..)` with the read error that ended the loop
    /// - `Internal` if the capture thread panicked
    pub fn join(self) -> Result<()> {
        match self.thread.join() {
            Ok(result) => result.map_err(ServerError::from),
            Err(_) => Err(ServerError::internal("capture thread panicked")),
        }
    }
}

// ============================================
// TrafficObserver
// ============================================

/// Live per-IP traffic feeds from one interface.
#[derive(Debug)]
pub struct TrafficObserver {
    /// Interface being observed
    device_name: String,
    /// Buffer size of each subscriber channel
    channel_capacity: usize,
    /// IP → subscriber bookkeeping
    registry: SubscriberRegistry,
    /// Capture loop counters
    stats: ObserverStats,
    /// Idle, capturing or ended
    state: AtomicU8,
    /// Asks the capture loop to return
    stopping: AtomicBool,
}

impl TrafficObserver {
    /// Creates an idle observer for `device_name`.
    ///
    /// # Panics
    /// Panics if `channel_capacity` is 0.
    #[must_use]
    pub fn new(device_name: impl Into<String>, channel_capacity: usize) -> Self {
        assert!(channel_capacity > 0, "channel capacity must be non-zero");
        Self {
            device_name: device_name.into(),
            channel_capacity,
            registry: SubscriberRegistry::new(),
            stats: ObserverStats::new(),
            state: AtomicU8::new(STATE_IDLE),
            stopping: AtomicBool::new(false),
        }
    }

    /// Creates an idle observer from validated configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.capture.device_name.clone(),
            config.observer.channel_capacity,
        )
    }

    /// Returns the observed interface name.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Returns the capture counters.
    #[must_use]
    pub const fn stats(&self) -> &ObserverStats {
        &self.stats
    }

    /// Returns the subscriber registry.
    #[must_use]
    pub const fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Returns `true` while a capture loop is running.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_CAPTURING
    }

    /// Returns `true` once the capture loop has ended.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_ENDED
    }

    // ========================================
    // Subscriptions
    // ========================================

    /// Streams packets whose source or destination is `ip` to `id`.
    ///
    /// Reusing a live id moves it to `ip` and closes its old receiver.
    /// Once the capture loop has ended the receiver is already closed.
    pub fn subscribe(&self, ip: Ipv4Addr, id: SubscriberId) -> PacketReceiver {
        self.registry.subscribe(ip, id, self.channel_capacity)
    }

    /// Stops streaming to `id` and closes its receiver.
    ///
    /// Returns `false` if `id` was not subscribed to `ip`; nothing changes.
    pub fn unsubscribe(&self, ip: Ipv4Addr, id: &SubscriberId) -> bool {
        self.registry.unsubscribe(ip, id)
    }

    // ========================================
    // Capture
    // ========================================

    /// Opens a live capture on the observed interface and runs the
    /// capture loop on a dedicated thread.
    ///
    /// # Errors
    /// - `CaptureAlreadyStarted` if a loop is running or has ended
    /// - `Capture(..)` if the interface cannot be opened
    #[cfg(target_os = "linux")]
    pub fn start_capture(self: &Arc<Self>, config: CaptureConfig) -> Result<CaptureHandle> {
        use tunnelscope_capture::PacketSocket;

        let config = CaptureConfig {
            device: self.device_name.clone(),
            ..config
        };

        self.claim_capture()?;
        let socket = match PacketSocket::open(config) {
            Ok(socket) => socket,
            Err(e) => {
                if e.requires_privileges() {
                    error!(
                        device = %self.device_name,
                        error = %e,
                        "Failed to open capture, run as root or grant CAP_NET_RAW"
                    );
                } else {
                    error!(device = %self.device_name, error = %e, "Failed to open capture");
                }
                self.state.store(STATE_IDLE, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        self.spawn_loop(socket)
    }

    /// Live capture is only available on Linux.
    ///
    /// # Errors
    /// Always returns `StartupFailed`.
    #[cfg(not(target_os = "linux"))]
    pub fn start_capture(self: &Arc<Self>, _config: CaptureConfig) -> Result<CaptureHandle> {
        Err(ServerError::startup_failed("live capture requires Linux"))
    }

    /// Runs the capture loop over `source` on a dedicated thread.
    ///
    /// # Errors
    /// `CaptureAlreadyStarted` if a loop is running or has ended, or an
    /// I/O error if the thread cannot be spawned.
    pub fn spawn_capture<S>(self: &Arc<Self>, source: S) -> Result<CaptureHandle>
    where
        S: FrameSource + 'static,
    {
        self.claim_capture()?;
        self.spawn_loop(source)
    }

    fn claim_capture(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_CAPTURING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ServerError::CaptureAlreadyStarted {
                device: self.device_name.clone(),
            });
        }
        Ok(())
    }

    fn spawn_loop<S>(self: &Arc<Self>, source: S) -> Result<CaptureHandle>
    where
        S: FrameSource + 'static,
    {
        let observer = Arc::clone(self);
        let (exit_tx, exit_rx) = oneshot::channel();

        let thread = thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || {
                let result = observer.run_capture(source);
                let _ = exit_tx.send(());
                result
            })
            .map_err(|e| {
                self.state.store(STATE_IDLE, Ordering::SeqCst);
                ServerError::Io(e)
            })?;

        Ok(CaptureHandle {
            thread,
            exit_rx,
            exited: false,
        })
    }

    /// Reads frames from `source` until it closes, `stop()` is called,
    /// or a non-retryable read error occurs. Then closes every
    /// subscriber stream.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    /// Returns the read error that ended the loop.
    pub fn run_capture<S: FrameSource>(&self, mut source: S) -> tunnelscope_capture::Result<()> {
        let _ended = EndOfCapture(self);

        info!(
            device = %source.device(),
            link_type = %source.link_type(),
            snapshot_len = source.snapshot_len(),
            "Capture loop started"
        );

        let mut handler = FrameHandler::new(source.link_type());
        let mut buf = vec![0u8; source.snapshot_len()];

        while !self.stopping.load(Ordering::Relaxed) {
            match source.next_frame(&mut buf) {
                Ok(Some(frame)) => {
                    handler.handle(&buf[..frame.len], &frame, &self.registry, &self.stats);
                }
                Ok(None) => {}
                Err(CaptureError::Closed) => {
                    info!(device = %source.device(), "Capture source closed");
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    debug!(error = %e, "Retrying capture read");
                }
                Err(e) => {
                    error!(device = %source.device(), error = %e, "Capture loop failed");
                    return Err(e);
                }
            }
        }

        info!(device = %source.device(), "Capture loop stopped");
        Ok(())
    }

    /// Asks the capture loop to return after its current read.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Relaxed);
    }

    fn end_capture(&self) {
        self.state.store(STATE_ENDED, Ordering::SeqCst);
        let closed = self.registry.close_all();
        info!(
            device = %self.device_name,
            closed_subscriptions = closed,
            "Capture ended, subscriber streams closed"
        );
    }
}

/// Marks the capture as ended when the loop returns or unwinds.
struct EndOfCapture<'a>(&'a TrafficObserver);

impl Drop for EndOfCapture<'_> {
    fn drop(&mut self) {
        self.0.end_capture();
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use tokio::sync::mpsc::error::TryRecvError;
    use tunnelscope_capture::{CapturedFrame, MockSource};
    use tunnelscope_common::LinkType;
    use tunnelscope_core::packet::testing;

    use super::*;

    /// Source whose link went away: one interrupted read, then `ENETDOWN`.
    struct LinkDownSource {
        reads: usize,
    }

    impl FrameSource for LinkDownSource {
        fn next_frame(
            &mut self,
            _buf: &mut [u8],
        ) -> tunnelscope_capture::Result<Option<CapturedFrame>> {
            self.reads += 1;
            let err = if self.reads == 1 {
                io::Error::from(io::ErrorKind::Interrupted)
            } else {
                io::Error::new(io::ErrorKind::Other, "ENETDOWN")
            };
            Err(CaptureError::read_failed(err))
        }

        fn link_type(&self) -> LinkType {
            LinkType::RawIp
        }

        fn device(&self) -> &str {
            "wg0"
        }

        fn snapshot_len(&self) -> usize {
            128
        }
    }

    /// Source that panics on the first read.
    struct PanickingSource;

    impl FrameSource for PanickingSource {
        fn next_frame(
            &mut self,
            _buf: &mut [u8],
        ) -> tunnelscope_capture::Result<Option<CapturedFrame>> {
            panic!("driver bug");
        }

        fn link_type(&self) -> LinkType {
            LinkType::RawIp
        }

        fn device(&self) -> &str {
            "wg0"
        }

        fn snapshot_len(&self) -> usize {
            128
        }
    }

    const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const OTHER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

    fn mock(link_type: LinkType) -> MockSource {
        MockSource::new(
            CaptureConfig::new("mock0").with_read_timeout(Duration::from_millis(10)),
            link_type,
        )
    }

    /// Feeds `frames` through a closed mock source on the current thread.
    fn run(observer: &TrafficObserver, link_type: LinkType, frames: Vec<Vec<u8>>) {
        let source = mock(link_type);
        source.inject_frames(frames);
        source.close();
        observer.run_capture(source).unwrap();
    }

    #[test]
    fn test_single_delivery_to_matching_subscriber() {
        let observer = TrafficObserver::new("mock0", 16);
        let mut watcher = observer.subscribe(CLIENT, SubscriberId::generate());
        let mut bystander = observer.subscribe(OTHER, SubscriberId::generate());

        run(
            &observer,
            LinkType::RawIp,
            vec![testing::udp_packet(CLIENT, REMOTE, b"query")],
        );

        let record = watcher.try_recv().unwrap();
        assert_eq!(record.flow.src, CLIENT);
        assert_eq!(record.flow.dst, REMOTE);
        // The source closed, so both streams have ended
        assert_eq!(watcher.try_recv(), Err(TryRecvError::Disconnected));
        assert_eq!(bystander.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_fan_out_to_two_ids() {
        let observer = TrafficObserver::new("mock0", 16);
        let mut a = observer.subscribe(CLIENT, SubscriberId::generate());
        let mut b = observer.subscribe(CLIENT, SubscriberId::generate());

        run(
            &observer,
            LinkType::Ethernet,
            vec![testing::ethernet_udp_frame(REMOTE, CLIENT, b"answer")],
        );

        let first = a.try_recv().unwrap();
        let second = b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.ethernet.is_some());
    }

    #[test]
    fn test_no_delivery_after_unsubscribe() {
        let observer = TrafficObserver::new("mock0", 16);
        let id = SubscriberId::generate();
        let mut rx = observer.subscribe(CLIENT, id);

        assert!(observer.unsubscribe(CLIENT, &id));
        run(
            &observer,
            LinkType::RawIp,
            vec![testing::udp_packet(CLIENT, REMOTE, b"late")],
        );

        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
        assert_eq!(observer.stats().snapshot().records_dispatched, 0);
    }

    #[test]
    fn test_resubscribe_is_independent() {
        let observer = TrafficObserver::new("mock0", 16);
        let first_id = SubscriberId::generate();
        let mut first = observer.subscribe(CLIENT, first_id);
        observer.unsubscribe(CLIENT, &first_id);

        let mut second = observer.subscribe(CLIENT, SubscriberId::generate());
        run(
            &observer,
            LinkType::RawIp,
            vec![testing::udp_packet(REMOTE, CLIENT, b"x")],
        );

        assert_eq!(first.try_recv(), Err(TryRecvError::Disconnected));
        assert!(second.try_recv().is_ok());
    }

    #[test]
    fn test_arp_produces_no_deliveries() {
        let observer = TrafficObserver::new("mock0", 16);
        let mut a = observer.subscribe(Ipv4Addr::new(10, 0, 0, 1), SubscriberId::generate());
        let mut b = observer.subscribe(CLIENT, SubscriberId::generate());

        run(&observer, LinkType::Ethernet, vec![testing::arp_frame()]);

        assert_eq!(a.try_recv(), Err(TryRecvError::Disconnected));
        assert_eq!(b.try_recv(), Err(TryRecvError::Disconnected));
        let snapshot = observer.stats().snapshot();
        assert_eq!(snapshot.frames_seen, 1);
        assert_eq!(snapshot.frames_dropped, 1);
    }

    #[test]
    fn test_delivery_in_capture_order() {
        let observer = TrafficObserver::new("mock0", 64);
        let mut rx = observer.subscribe(CLIENT, SubscriberId::generate());

        let frames: Vec<_> = (0u8..20)
            .map(|i| testing::udp_packet(CLIENT, REMOTE, &[i]))
            .collect();
        run(&observer, LinkType::RawIp, frames);

        for i in 0u8..20 {
            assert_eq!(*rx.try_recv().unwrap().data.last().unwrap(), i);
        }
    }

    #[test]
    fn test_slow_subscriber_loses_newest() {
        let observer = TrafficObserver::new("mock0", 2);
        let mut slow = observer.subscribe(CLIENT, SubscriberId::generate());

        let frames: Vec<_> = (0u8..5)
            .map(|i| testing::udp_packet(CLIENT, REMOTE, &[i]))
            .collect();
        run(&observer, LinkType::RawIp, frames);

        assert_eq!(*slow.try_recv().unwrap().data.last().unwrap(), 0);
        assert_eq!(*slow.try_recv().unwrap().data.last().unwrap(), 1);
        assert_eq!(slow.try_recv(), Err(TryRecvError::Disconnected));

        let snapshot = observer.stats().snapshot();
        assert_eq!(snapshot.deliveries, 2);
        assert_eq!(snapshot.deliveries_dropped, 3);
    }

    #[test]
    fn test_capture_started_once() {
        let observer = Arc::new(TrafficObserver::new("mock0", 16));
        let source = mock(LinkType::RawIp);

        let handle = observer.spawn_capture(source.clone()).unwrap();
        assert!(observer.is_capturing());
        assert!(matches!(
            observer.spawn_capture(mock(LinkType::RawIp)),
            Err(ServerError::CaptureAlreadyStarted { .. })
        ));

        source.close();
        handle.join().unwrap();

        assert!(!observer.is_capturing());
        assert!(observer.has_ended());
        assert!(matches!(
            observer.spawn_capture(mock(LinkType::RawIp)),
            Err(ServerError::CaptureAlreadyStarted { .. })
        ));
    }

    #[test]
    fn test_stop_ends_loop() {
        let observer = Arc::new(TrafficObserver::new("mock0", 16));
        let handle = observer.spawn_capture(mock(LinkType::RawIp)).unwrap();

        observer.stop();
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_async_subscriber() {
        let observer = Arc::new(TrafficObserver::new("mock0", 16));
        let source = mock(LinkType::RawIp);
        let handle = observer.spawn_capture(source.clone()).unwrap();

        let mut rx = observer.subscribe(CLIENT, SubscriberId::generate());
        source.inject_frame(testing::udp_packet(REMOTE, CLIENT, b"pong"));

        let record = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.flow.dst, CLIENT);

        source.close();
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_subscribe_during_capture() {
        let observer = Arc::new(TrafficObserver::new("mock0", 8));
        let source = mock(LinkType::RawIp);
        let capture = observer.spawn_capture(source.clone()).unwrap();

        let hosts: Vec<Ipv4Addr> = (2u8..10).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect();

        let injector = {
            let source = source.clone();
            let hosts = hosts.clone();
            thread::spawn(move || {
                for round in 0..200 {
                    let host = hosts[round % hosts.len()];
                    source.inject_frame(testing::udp_packet(host, REMOTE, b"a"));
                    source.inject_frame(testing::udp_packet(REMOTE, host, b"b"));
                }
            })
        };

        let churners: Vec<_> = (0..4)
            .map(|worker| {
                let observer = Arc::clone(&observer);
                let hosts = hosts.clone();
                thread::spawn(move || {
                    for round in 0..100 {
                        let ip = hosts[(worker + round) % hosts.len()];
                        let id = SubscriberId::generate();
                        let mut rx = observer.subscribe(ip, id);
                        while rx.try_recv().is_ok() {}
                        assert!(observer.unsubscribe(ip, &id));
                    }
                })
            })
            .collect();

        injector.join().unwrap();
        for churner in churners {
            churner.join().unwrap();
        }
        source.close();
        capture.join().unwrap();

        observer.registry().assert_consistent();
        assert!(observer.registry().is_empty());
        assert_eq!(observer.stats().snapshot().frames_seen, 400);
    }

    #[tokio::test]
    async fn test_failed_capture_closes_subscribers() {
        let observer = Arc::new(TrafficObserver::new("wg0", 16));
        let mut rx = observer.subscribe(CLIENT, SubscriberId::generate());

        let mut capture = observer.spawn_capture(LinkDownSource { reads: 0 }).unwrap();
        tokio::time::timeout(Duration::from_secs(5), capture.exited())
            .await
            .unwrap();

        let err = capture.join().unwrap_err();
        assert!(matches!(
            err,
            ServerError::Capture(CaptureError::ReadFailed { .. })
        ));
        assert!(err.to_string().contains("ENETDOWN"));

        let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(next.is_none());
        assert!(!observer.is_capturing());
        assert!(observer.has_ended());
        assert!(observer.registry().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_after_capture_ended() {
        let observer = Arc::new(TrafficObserver::new("wg0", 16));
        let mut capture = observer.spawn_capture(LinkDownSource { reads: 0 }).unwrap();
        capture.exited().await;
        assert!(capture.join().is_err());

        let mut late = observer.subscribe(CLIENT, SubscriberId::generate());
        assert!(late.recv().await.is_none());
        assert!(observer.registry().is_empty());
    }

    #[tokio::test]
    async fn test_panicked_capture_closes_subscribers() {
        let observer = Arc::new(TrafficObserver::new("wg0", 16));
        let mut rx = observer.subscribe(CLIENT, SubscriberId::generate());

        let mut capture = observer.spawn_capture(PanickingSource).unwrap();
        tokio::time::timeout(Duration::from_secs(5), capture.exited())
            .await
            .unwrap();
        // Later calls return at once
        capture.exited().await;

        assert!(matches!(
            capture.join(),
            Err(ServerError::Internal { .. })
        ));
        assert!(rx.recv().await.is_none());
        assert!(observer.has_ended());
    }
}
