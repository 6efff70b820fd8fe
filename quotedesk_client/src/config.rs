//! Validated client configuration.
//!
//! Built from CLI arguments; derives both endpoint URLs from the single origin so
//! a bad origin fails at startup rather than on the first connect.
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use log::info;
use quotedesk_common::instrument::InstrumentParser;
use quotedesk_common::net::{DEFAULT_ORIGIN, order_url, stream_url};
use quotedesk_common::{DeskError, InstrumentId, Result};
use url::Url;

use crate::args::Args;
use crate::transport::ReconnectPolicy;

/// Everything the session needs to start.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP origin of the server.
    pub origin: Url,
    /// WebSocket endpoint derived from `origin`.
    pub stream_url: Url,
    /// Order endpoint derived from `origin`.
    pub order_url: Url,
    /// Reconnection ceiling and delay unit.
    pub policy: ReconnectPolicy,
    /// Read timeout of the link thread.
    pub poll_interval: Duration,
    /// Timeout of one order request.
    pub order_timeout: Duration,
    /// Optional ticker file applied after the first resync.
    pub watchlist: Option<PathBuf>,
}

impl ClientConfig {
    /// Default settings against `origin`.
    pub fn for_origin(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin.trim())?;
        Ok(Self {
            stream_url: stream_url(&origin)?,
            order_url: order_url(&origin)?,
            origin,
            policy: ReconnectPolicy::default(),
            poll_interval: Duration::from_millis(100),
            order_timeout: Duration::from_secs(10),
            watchlist: None,
        })
    }

    /// Settings from parsed CLI arguments.
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.max_reconnect_attempts == 0 {
            info!("Automatic reconnection disabled");
        }
        if args.poll_interval_ms == 0 {
            return Err(DeskError::Format(String::from(
                "--poll-interval-ms must be greater than zero",
            )));
        }
        let mut config = Self::for_origin(&args.origin)?;
        config.policy = ReconnectPolicy::new(
            args.max_reconnect_attempts,
            Duration::from_millis(args.reconnect_delay_ms),
        );
        config.poll_interval = Duration::from_millis(args.poll_interval_ms);
        config.order_timeout = Duration::from_secs(args.order_timeout_secs);
        config.watchlist = args.watchlist.as_deref().map(normalize_path);
        Ok(config)
    }

    /// Reads the watchlist file, or returns an empty list when none is configured.
    pub fn load_watchlist(&self) -> Result<Vec<InstrumentId>> {
        let Some(path) = &self.watchlist else {
            return Ok(Vec::new());
        };
        if !is_file_exist(path) {
            return Err(DeskError::Format(format!(
                "watchlist file not found: {}",
                path.display()
            )));
        }
        let file = File::open(path)?;
        let instruments = InstrumentId::parse_from_file(BufReader::new(file))?;
        info!("Watchlist: {} instruments", instruments.len());
        Ok(instruments)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_origin(DEFAULT_ORIGIN).expect("default origin is a valid http URL")
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_cli_defaults() {
        let args = Args::parse_from(["quotedesk"]);
        let config = ClientConfig::from_args(&args).unwrap();
        let default = ClientConfig::default();
        assert_eq!(config.stream_url, default.stream_url);
        assert_eq!(config.policy, default.policy);
        assert_eq!(config.poll_interval, default.poll_interval);
        assert_eq!(config.stream_url.as_str(), "ws://127.0.0.1:8000/ws");
    }

    #[test]
    fn args_override_policy_and_origin() {
        let args = Args::parse_from([
            "quotedesk",
            "--origin",
            "https://desk.example.com",
            "--max-reconnect-attempts",
            "3",
            "--reconnect-delay-ms",
            "250",
            "--watchlist",
            "\"C:\\tickers.txt\"",
        ]);
        let config = ClientConfig::from_args(&args).unwrap();
        assert_eq!(config.stream_url.as_str(), "wss://desk.example.com/ws");
        assert_eq!(
            config.order_url.as_str(),
            "https://desk.example.com/api/order/market"
        );
        assert_eq!(config.policy.max_attempts, 3);
        assert_eq!(config.policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(config.watchlist, Some(PathBuf::from("C:\\tickers.txt")));
    }

    #[test]
    fn invalid_origin_fails_fast() {
        assert!(ClientConfig::for_origin("not a url").is_err());
        assert!(ClientConfig::for_origin("ftp://example.com").is_err());
    }

    #[test]
    fn missing_watchlist_is_an_error() {
        let mut config = ClientConfig::default();
        assert!(config.load_watchlist().unwrap().is_empty());
        config.watchlist = Some(PathBuf::from("/definitely/not/here.txt"));
        assert!(config.load_watchlist().is_err());
    }
}
