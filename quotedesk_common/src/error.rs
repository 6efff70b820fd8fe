//! Error types shared between the session core and the binary.
//!
//! The `DeskError` enum unifies I/O, serialization, channel, validation and
//! transport failures, allowing every component to propagate a single error type.
//! Foreign errors without a `From` conversion (WebSocket, HTTP) are folded into
//! `Transport` with their display text.
use std::io;

use thiserror::Error;

/// Unified error type shared by every quotedesk crate.
#[derive(Error, Debug)]
pub enum DeskError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Malformed origin or endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Network-level failure on the streaming link or the order side-channel.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A message was submitted while the streaming connection is not open.
    #[error("Not connected to the quote server")]
    NotConnected,

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// The supplied instrument token is blank after normalization.
    #[error("Invalid instrument: {0}")]
    InvalidInstrument(String),

    /// Order quantity is not a positive integer.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The order endpoint answered with `success: false`.
    #[error("Order rejected: {0}")]
    OrderRejected(String),
}
