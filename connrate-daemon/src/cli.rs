//! CLI argument definitions for connrate-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use connrate_core::config::DEFAULT_CONFIG_PATH;

/// A10 Thunder connection-rate-limit alert bridge.
///
/// Receives syslog from Thunder nodes over UDP and publishes an MQTT
/// notification for every "connection rate limit ... exceeded" event.
#[derive(Parser, Debug)]
#[command(name = "connrate-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
