// ============================================
// File: crates/tunnelscope-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Owns the services for the life of the process: builds them from
//! configuration, starts the capture thread and shuts down on Ctrl+C.
//!
//! ## Main Functionality
//! - `Server`: Service construction and lifecycle
//! - Capture thread start and supervised exit
//! - Periodic statistics task
//! - Graceful shutdown handling
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌────────────────────┐     ┌────────────────────────────┐  │
//! │  │ Capture thread     │     │ Stats task (tokio)         │  │
//! │  │ (std::thread)      │     │  every stats_interval_secs │  │
//! │  │ read → decode →    │     │  log ObserverStats         │  │
//! │  │ dispatch           │     └────────────────────────────┘  │
//! │  └─────────┬──────────┘                                     │
//! │            │ exits on error                                 │
//! │            ▼                                                │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ run(): select { ctrl_c, capture exit }              │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Server requires root or CAP_NET_RAW for capture
//! - A capture open failure aborts `run()` immediately
//! - All services are Arc-wrapped for sharing
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::services::{LeaseService, TrafficObserver};

/// Time allowed for background work to finish after shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================
// Server
// ============================================

/// Main tunnelscope server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await`
/// 3. Shutdown via Ctrl+C, or when the capture loop fails
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Traffic observer.
    observer: Arc<TrafficObserver>,
    /// Address leasing.
    leases: Arc<LeaseService>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// # Errors
    /// Returns error if the subnet configuration is invalid.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let leases = Arc::new(LeaseService::new(config.address_pool()?));
        let observer = Arc::new(TrafficObserver::from_config(&config));
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            observer,
            leases,
            shutdown_tx,
        })
    }

    /// Returns the traffic observer.
    #[must_use]
    pub const fn observer(&self) -> &Arc<TrafficObserver> {
        &self.observer
    }

    /// Returns the lease service.
    #[must_use]
    pub const fn leases(&self) -> &Arc<LeaseService> {
        &self.leases
    }

    /// Runs the server until shutdown.
    ///
    /// # Errors
    /// Returns error if capture cannot be opened or the capture loop fails.
    pub async fn run(&self) -> Result<()> {
        info!("Starting tunnelscope v{}", env!("CARGO_PKG_VERSION"));
        info!(
            subnet = %self.leases.range(),
            leasable = self.leases.capacity(),
            device = %self.observer.device_name(),
            "Services initialized"
        );

        let mut capture = self.observer.start_capture(self.config.capture_config())?;

        let stats_task = self.spawn_stats_task();

        info!("Server started successfully");

        let capture_ended = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Received shutdown signal");
                false
            }
            () = capture.exited() => true,
        };

        // Shutdown
        info!("Shutting down server...");
        self.shutdown();

        let capture_ended = capture_ended
            || tokio::time::timeout(SHUTDOWN_GRACE, capture.exited())
                .await
                .is_ok();

        match tokio::time::timeout(SHUTDOWN_GRACE, stats_task).await {
            Ok(Ok(())) => debug!("Stats task completed"),
            Ok(Err(e)) => warn!("Stats task failed: {}", e),
            Err(_) => warn!("Stats task timed out during shutdown"),
        }

        let result = if capture_ended {
            capture.join()
        } else {
            // Dropping the handle detaches the thread; process exit ends it
            warn!("Capture thread still blocked in read, exiting without it");
            Ok(())
        };

        info!("Server shutdown complete");
        result
    }

    /// Spawns the periodic statistics task.
    fn spawn_stats_task(&self) -> JoinHandle<()> {
        let observer = Arc::clone(&self.observer);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_secs(self.config.observer.stats_interval_secs);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            // The first tick completes immediately
            interval_timer.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Stats task received shutdown signal");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        let stats = observer.stats().snapshot();
                        info!(
                            frames_seen = stats.frames_seen,
                            frames_dropped = stats.frames_dropped,
                            records = stats.records_dispatched,
                            deliveries = stats.deliveries,
                            overflowed = stats.deliveries_dropped,
                            subscribers = observer.registry().count(),
                            watched_ips = observer.registry().watched_ips(),
                            "Observer statistics"
                        );
                    }
                }
            }

            debug!("Stats task exiting");
        })
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.observer.stop();
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("subnet", &self.config.subnet.cidr)
            .field("device", &self.config.capture.device_name)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use tunnelscope_capture::{CaptureConfig, MockSource};
    use tunnelscope_common::LinkType;

    use super::*;

    #[test]
    fn test_new_builds_services() {
        let config: ServerConfig = r#"
            [subnet]
            cidr = "10.9.0.0/24"
            server_address = "10.9.0.1"

            [capture]
            device_name = "wg7"
        "#
        .parse()
        .unwrap();

        let server = Server::new(config).unwrap();
        assert_eq!(server.leases().capacity(), 253);
        assert_eq!(server.observer().device_name(), "wg7");
        assert!(!server.observer().is_capturing());
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_interface() {
        let mut config = ServerConfig::default();
        config.capture.device_name = "tsmissing0".to_string();

        let server = Server::new(config).unwrap();
        let err = server.run().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_shutdown_stops_observer() {
        let server = Server::new(ServerConfig::default()).unwrap();
        let mut capture = server
            .observer()
            .spawn_capture(MockSource::new(
                CaptureConfig::new("wg0").with_read_timeout(Duration::from_millis(10)),
                LinkType::RawIp,
            ))
            .unwrap();

        server.shutdown();
        tokio::time::timeout(SHUTDOWN_GRACE, capture.exited())
            .await
            .unwrap();
        capture.join().unwrap();
        assert!(server.observer().has_ended());
    }
}
