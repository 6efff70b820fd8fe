//! Quote Desk client: streams live quotes from the dashboard server over a
//! WebSocket, keeps the subscription list in sync, and places market orders.
//!
//! Commands are read from stdin, one per line (see `command`). Notices are printed
//! to stdout; logs go to stderr.
//!
//! Usage example (CLI):
//! ```bash
//! quotedesk --origin http://192.168.0.10:8000 --watchlist ./tickers.txt
//! ```
#![warn(missing_docs)]
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{Sender, bounded, unbounded};
use log::{debug, error, info, warn};
use quotedesk_client::SessionController;
use quotedesk_client::args::Args;
use quotedesk_client::command::UserCommand;
use quotedesk_client::config::ClientConfig;
use quotedesk_client::order::{HttpOrderTransport, OrderGateway};
use quotedesk_client::transport::{TransportSession, WsConnector};
use quotedesk_common::{DeskError, Result};

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let config = ClientConfig::from_args(&args)?;
    let watchlist = config.load_watchlist()?;

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down client...");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| DeskError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    let (notice_tx, notice_rx) = unbounded();
    thread::spawn(move || {
        for notice in notice_rx {
            println!("{}", notice);
        }
    });

    let (command_tx, command_rx) = unbounded();
    start_stdin_thread(command_tx);

    info!("Streaming from {}", config.stream_url);
    let connector = WsConnector::new(config.stream_url.clone(), config.poll_interval);
    let transport = TransportSession::new(Box::new(connector), config.policy);
    let orders = HttpOrderTransport::new(config.order_url.clone(), config.order_timeout)?;
    let gateway = OrderGateway::new(Arc::new(orders));

    let controller = SessionController::new(transport, gateway, notice_tx).with_watchlist(watchlist);
    info!("Client is running. Type 'quit' or press Ctrl+C to exit.");
    controller.run(command_rx, shutdown_rx)?;
    info!("Client stopped");
    Ok(())
}

/// Reads commands from stdin on a background thread until EOF.
fn start_stdin_thread(commands: Sender<UserCommand>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<UserCommand>() {
                Ok(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
        debug!("stdin reader stopping...");
    });
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
