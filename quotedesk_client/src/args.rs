//! Command-line arguments for the quotedesk client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use quotedesk_common::net::DEFAULT_ORIGIN;

use crate::transport::policy::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// HTTP origin of the dashboard server. The streaming URL switches to
    /// `wss` when the origin uses `https`.
    #[clap(long, default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// Automatic reconnect attempts before giving up.
    #[clap(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_reconnect_attempts: u32,

    /// Delay unit in milliseconds; attempt `n` waits `n` units.
    #[clap(long, default_value_t = DEFAULT_BASE_DELAY_MS)]
    pub reconnect_delay_ms: u64,

    /// Socket read timeout in milliseconds, bounding outbound latency.
    #[clap(long, default_value_t = 100)]
    pub poll_interval_ms: u64,

    /// Timeout for a single order request, in seconds.
    #[clap(long, default_value_t = 10)]
    pub order_timeout_secs: u64,

    /// Optional file with tickers to subscribe after the first resync.
    /// Tickers may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub watchlist: Option<String>,
}
