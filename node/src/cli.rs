//! # CLI Interface
//!
//! Defines the command-line argument structure for `tavern-node` using
//! `clap` derive. Two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tavern realtime session server.
///
/// Authenticates wallet-holding patrons over a challenge handshake,
/// runs the daily-quota story economy, and serves the room over a
/// WebSocket endpoint.
#[derive(Parser, Debug)]
#[command(
    name = "tavern-node",
    about = "Tavern realtime session server",
    version,
    propagate_version = true
)]
pub struct TavernNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the tavern node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the session server.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Socket address to serve the WebSocket and HTTP endpoints on.
    #[arg(long, env = "TAVERN_LISTEN", default_value = "0.0.0.0:2567")]
    pub listen: String,

    /// Path to the data directory where the story database lives.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "TAVERN_DATA_DIR", default_value = "./tavern-data")]
    pub data_dir: PathBuf,

    /// UTC offset (whole hours) of the reference timezone for the
    /// daily-quota calendar. Day rollover happens at midnight in this
    /// zone for every account at once.
    #[arg(long, env = "TAVERN_QUOTA_OFFSET", default_value_t = 0)]
    pub quota_offset_hours: i32,

    /// Hex-encoded 32-byte seed for the credential-signing key.
    ///
    /// When omitted, an ephemeral key is generated and every issued
    /// credential dies with the process. **Never pass this flag on a
    /// shared command line** — use the environment variable.
    #[arg(long, env = "TAVERN_CREDENTIAL_KEY")]
    pub credential_key: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "TAVERN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
