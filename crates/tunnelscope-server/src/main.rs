// ============================================
// File: crates/tunnelscope-server/src/main.rs
// ============================================
//! # tunnelscope Entry Point
//!
//! ## Creation Reason
//! Main entry point for the tunnelscope binary.
//! Handles CLI parsing, logging setup, and command dispatch.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Server execution and one-shot address commands
//!
//! ## Usage
//! ```bash
//! # Observe wg0 and log statistics
//! tunnelscope start
//!
//! # Stream one device's traffic as JSON lines
//! tunnelscope watch --ip 10.0.0.2
//!
//! # Address arithmetic
//! tunnelscope addresses                  # List the leasable pool
//! tunnelscope next --current 10.0.0.41   # Successor of an address
//! tunnelscope validate                   # Validate config file
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `start` and `watch` require root or CAP_NET_RAW
//! - Logs go to stderr; `watch` and `addresses` print data to stdout
//! - A closed stdout (`| head`) ends output quietly
//! - A config file that exists but is invalid is always an error;
//!   defaults apply only when the file is missing
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunnelscope_common::SubscriberId;
use tunnelscope_core::{AddressPool, AddressRange, PacketRecord};
use tunnelscope_server::{Server, ServerConfig, TrafficObserver};

/// Default configuration file location.
const DEFAULT_CONFIG_PATH: &str = "/etc/tunnelscope/tunnelscope.toml";

// ============================================
// CLI Definition
// ============================================

/// tunnelscope: address leasing and live traffic feeds for a WireGuard subnet
#[derive(Parser, Debug)]
#[command(name = "tunnelscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture on the VPN interface until Ctrl+C
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Print packets to or from one device as JSON lines
    Watch {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Device address to watch
        #[arg(long)]
        ip: Ipv4Addr,
    },

    /// List every leasable address of the subnet
    Addresses {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Subnet to use instead of the configured one (CIDR)
        #[arg(long)]
        subnet: Option<String>,
    },

    /// Print the address that follows CURRENT in the subnet
    Next {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Last assigned address
        #[arg(long)]
        current: Ipv4Addr,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Watch { config, ip } => cmd_watch(config, ip).await,
        Commands::Addresses { config, subnet } => cmd_addresses(config, subnet).await,
        Commands::Next { config, current } => cmd_next(config, current).await,
        Commands::Validate { config } => cmd_validate(config).await,
    };

    // Handle errors
    if let Err(e) = result {
        init_logging("info");
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Runs the server.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_config(&config_path).await?;
    init_logging(&config.logging.level);

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}

/// Streams one device's packets to stdout.
async fn cmd_watch(config_path: PathBuf, ip: Ipv4Addr) -> anyhow::Result<()> {
    let config = load_config(&config_path).await?;
    init_logging(&config.logging.level);

    let observer = Arc::new(TrafficObserver::from_config(&config));
    let id = SubscriberId::generate();
    let mut packets = observer.subscribe(ip, id);

    let mut capture = observer.start_capture(config.capture_config())?;
    info!(ip = %ip, subscriber = %id, "Watching device traffic");

    let stdout = io::stdout();
    let capture_ended = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break false;
            }
            () = capture.exited() => break true,
            record = packets.recv() => {
                // The stream only closes when the capture loop ends
                let Some(record) = record else { break true };
                if !write_record(&mut stdout.lock(), &record)? {
                    break false;
                }
            }
        }
    };

    if capture_ended {
        while let Ok(record) = packets.try_recv() {
            if !write_record(&mut stdout.lock(), &record)? {
                break;
            }
        }
        capture.exited().await;
        capture.join()?;
        info!(ip = %ip, "Capture source closed, watch ended");
        return Ok(());
    }

    observer.unsubscribe(ip, &id);
    observer.stop();
    info!(ip = %ip, "Watch ended");
    Ok(())
}

/// Lists the leasable pool, one address per line.
async fn cmd_addresses(config_path: PathBuf, subnet: Option<String>) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;

    let pool = match subnet {
        Some(cidr) => AddressPool::new(cidr.parse::<AddressRange>()?),
        None => config.address_pool()?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for address in pool.iter() {
        if !still_writing(writeln!(out, "{address}"))? {
            return Ok(());
        }
    }
    still_writing(out.flush())?;

    Ok(())
}

/// Prints the successor of `current`.
async fn cmd_next(config_path: PathBuf, current: Ipv4Addr) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;
    let range = config.address_range()?;

    println!("{}", range.next(current)?);
    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Defaults will be used.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;
    let range = config.address_range()?;
    let pool = config.address_pool()?;

    println!("✅ Configuration is valid");
    println!();
    println!("Subnet:");
    println!("   Block:      {range}");
    println!("   Network:    {}", range.start());
    println!("   Broadcast:  {}", range.finish());
    if let Some(server) = config.subnet.server_address {
        println!("   Server:     {server}");
    }
    println!("   Leasable:   {}", pool.capacity());
    println!();
    println!("Capture:");
    println!("   Device:     {}", config.capture.device_name);
    println!("   Snapshot:   {} bytes", config.capture.snapshot_len);
    println!("   Timeout:    {} ms", config.capture.read_timeout_ms);
    println!("   Promisc:    {}", config.capture.promiscuous);
    println!();
    println!("Observer:");
    println!("   Channel capacity:  {}", config.observer.channel_capacity);
    println!("   Stats interval:    {}s", config.observer.stats_interval_secs);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config, falling back to defaults when the file is absent.
async fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        init_logging("info");
        warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}

/// Loads config, or returns defaults when the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        Ok(ServerConfig::default())
    }
}

/// Writes one packet record as a JSON line.
///
/// Returns `false` once the reader has gone away.
fn write_record(out: &mut impl Write, record: &PacketRecord) -> anyhow::Result<bool> {
    let line = serde_json::to_string(record)?;
    Ok(still_writing(
        writeln!(out, "{line}").and_then(|()| out.flush()),
    )?)
}

/// Maps a stdout write result; `Ok(false)` means the pipe was closed.
fn still_writing(result: io::Result<()>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(e) => Err(e),
    }
}

// ============================================
// Tests
// ============================================
