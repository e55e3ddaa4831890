// ============================================
// File: crates/tunnelscope-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for tunnelscope from a TOML file.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Conversion into `AddressRange`, `AddressPool` and `CaptureConfig`
//!
//! ## Configuration Sections
//! - `subnet`: CIDR block handed out to devices, reserved server address
//! - `capture`: Interface to observe, snapshot length, read timeout
//! - `observer`: Per-subscriber channel capacity, stats interval
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [subnet]
//! cidr = "10.0.0.0/24"
//! server_address = "10.0.0.1"
//!
//! [capture]
//! device_name = "wg0"
//! snapshot_len = 1024
//! read_timeout_ms = 30000
//! promiscuous = false
//!
//! [observer]
//! channel_capacity = 256
//! stats_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require restart
//! - Host bits in `subnet.cidr` are ignored (10.0.0.7/24 means 10.0.0.0/24)
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use tunnelscope_capture::{CaptureConfig, CaptureError};
use tunnelscope_core::{AddressPool, AddressRange};

use crate::error::{Result, ServerError};

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address block configuration.
    #[serde(default)]
    pub subnet: SubnetConfig,

    /// Capture session configuration.
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Subscriber delivery configuration.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!(path = %path_str, "Loading configuration");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.subnet.validate()?;
        self.capture.validate()?;
        self.observer.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns the configured address block.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if `subnet.cidr` does not parse.
    pub fn address_range(&self) -> Result<AddressRange> {
        self.subnet.address_range()
    }

    /// Returns the leasable pool, with the server address reserved.
    ///
    /// # Errors
    /// Returns error if the block or the server address is invalid.
    pub fn address_pool(&self) -> Result<AddressPool> {
        self.subnet.address_pool()
    }

    /// Returns the capture session configuration.
    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        self.capture.to_capture_config()
    }
}

impl FromStr for ServerConfig {
    type Err = ServerError;

    fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================
// SubnetConfig
// ============================================

/// Address block section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetConfig {
    /// Address block in CIDR notation.
    #[serde(default = "default_cidr")]
    pub cidr: String,

    /// Address of the VPN server itself, never leased to a device.
    #[serde(default)]
    pub server_address: Option<Ipv4Addr>,
}

fn default_cidr() -> String {
    "10.0.0.0/24".to_string()
}

impl SubnetConfig {
    fn validate(&self) -> Result<()> {
        self.address_pool().map(|_| ())
    }

    fn address_range(&self) -> Result<AddressRange> {
        self.cidr
            .parse()
            .map_err(|e: tunnelscope_core::CoreError| {
                ServerError::config_invalid("subnet.cidr", e.to_string())
            })
    }

    fn address_pool(&self) -> Result<AddressPool> {
        let pool = AddressPool::new(self.address_range()?);
        match self.server_address {
            Some(address) => pool
                .with_reserved(address)
                .map_err(|e| ServerError::config_invalid("subnet.server_address", e.to_string())),
            None => Ok(pool),
        }
    }
}

impl Default for SubnetConfig {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
            server_address: None,
        }
    }
}

// ============================================
// CaptureSettings
// ============================================

/// Capture session section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Interface to observe.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Bytes kept from each frame.
    #[serde(default = "default_snapshot_len")]
    pub snapshot_len: usize,

    /// Maximum time one read blocks, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Whether to put the interface in promiscuous mode.
    #[serde(default)]
    pub promiscuous: bool,
}

fn default_device_name() -> String {
    "wg0".to_string()
}

fn default_snapshot_len() -> usize {
    1024
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

impl CaptureSettings {
    fn validate(&self) -> Result<()> {
        self.to_capture_config().validate().map_err(|e| match e {
            CaptureError::InvalidConfig { field, reason } => {
                ServerError::config_invalid(format!("capture.{field}"), reason)
            }
            other => ServerError::from(other),
        })
    }

    fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig::new(&self.device_name)
            .with_snapshot_len(self.snapshot_len)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
            .with_promiscuous(self.promiscuous)
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            snapshot_len: default_snapshot_len(),
            read_timeout_ms: default_read_timeout_ms(),
            promiscuous: false,
        }
    }
}

// ============================================
// ObserverConfig
// ============================================

/// Subscriber delivery section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Packets buffered per subscriber before new ones are dropped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Seconds between statistics log lines.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl ObserverConfig {
    fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(ServerError::config_invalid(
                "observer.channel_capacity",
                "must be greater than 0",
            ));
        }

        if self.stats_interval_secs == 0 {
            return Err(ServerError::config_invalid(
                "observer.stats_interval_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================
