//! Command-line interface parsing
//!
//! This module handles parsing of CLI arguments using clap. With no subcommand the
//! interactive converter starts; `show` prints the rate once; `serve` runs the proxy.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{default_cache_dir, ClientConfig, DEFAULT_BIND, DEFAULT_ENDPOINT};
use crate::convert::SwapMode;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The endpoint is not an http(s) URL
    #[error("Invalid endpoint: '{0}'. Expected an http:// or https:// URL")]
    InvalidEndpoint(String),
}

/// DolarLempira - USD/HNL exchange rate and converter
#[derive(Parser, Debug)]
#[command(name = "dolarlempira")]
#[command(about = "USD to Honduran lempira exchange rate and converter")]
#[command(version)]
pub struct Cli {
    /// Rate proxy endpoint
    #[arg(long, env = "DOLARLEMPIRA_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// Directory for the rate cache (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Swap like the browser widget: the HNL amount becomes the new USD amount
    #[arg(long)]
    pub legacy_swap: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Non-interactive modes
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current rate and conversion table, then exit
    Show,
    /// Run the rate proxy endpoint
    ///
    /// Reads BCH_API_KEY (and optionally BCH_API_URL, DOLARLEMPIRA_ENV) from the
    /// environment or a .env file.
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
    },
}

fn validate_endpoint(endpoint: &str) -> Result<(), CliError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(CliError::InvalidEndpoint(endpoint.to_string()))
    }
}

impl ClientConfig {
    /// Builds the client configuration from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` with CLI overrides applied
    /// * `Err(CliError)` if the endpoint is not an http(s) URL
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        validate_endpoint(&cli.endpoint)?;
        Ok(ClientConfig {
            endpoint: cli.endpoint.clone(),
            cache_dir: cli.cache_dir.clone().unwrap_or_else(default_cache_dir),
            swap_mode: if cli.legacy_swap {
                SwapMode::Legacy
            } else {
                SwapMode::Unit
            },
            ..ClientConfig::default()
        })
    }
}
