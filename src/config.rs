//! Configuration management for the grid splitter.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks using the `SPLITTER_` prefix:
//!
//! - `SPLITTER_HOST` - Server bind address (default: 0.0.0.0)
//! - `SPLITTER_PORT` - Server port (default: 3000)
//! - `SPLITTER_OUTPUT_DIR` - Content directory for tiles (default: output)
//! - `SPLITTER_BASE_URL` - Public base URL reported to clients
//! - `SPLITTER_FETCH_TIMEOUT` - Source image fetch timeout in seconds (default: 30)
//! - `SPLITTER_CLEANUP_INTERVAL` - Seconds between expiry sweeps (default: 3600)
//! - `SPLITTER_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use grid_splitter::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Sweep(config) => println!("Sweeping {}", config.output_dir.display()),
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::service::DEFAULT_CLEANUP_INTERVAL_SECS;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default content directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Grid Splitter - cut remote images into grids of tiles.
///
/// Fetches an image by URL, splits it into equally sized tiles, and serves
/// the tiles over HTTP until they expire. Runs the server when no subcommand
/// is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "grid-splitter")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeConfig),

    /// Delete expired tiles once and exit
    Sweep(SweepConfig),
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SPLITTER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SPLITTER_PORT")]
    pub port: u16,

    /// Directory tiles and their expiry records are written to.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "SPLITTER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Public base URL reported in responses.
    ///
    /// If not specified, derived from the Host header of each request.
    #[arg(long, env = "SPLITTER_BASE_URL")]
    pub base_url: Option<String>,

    /// Timeout for fetching a source image, in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "SPLITTER_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    /// Seconds between background expiry sweeps.
    #[arg(long, default_value_t = DEFAULT_CLEANUP_INTERVAL_SECS, env = "SPLITTER_CLEANUP_INTERVAL")]
    pub cleanup_interval: u64,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SPLITTER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }

        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        if self.cleanup_interval == 0 {
            return Err("cleanup_interval must be greater than 0".to_string());
        }

        if let Some(ref base_url) = self.base_url {
            let url = Url::parse(base_url)
                .map_err(|e| format!("base_url {:?} is not a valid URL: {}", base_url, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("base_url {:?} must use http or https", base_url));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

// =============================================================================
// Sweep Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct SweepConfig {
    /// Directory to sweep.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "SPLITTER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
