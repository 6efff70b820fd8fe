//!
//! Common types and utilities shared by the quotedesk session core and binary.
//!
//! This crate aggregates:
//! - `error` — unified error type `DeskError` used across the workspace.
//! - `result` — handy `Result<T, DeskError>` alias.
//! - `instrument` — normalized instrument ids, watchlist parsing and presets.
//! - `quote` — the quote snapshot pushed by the server.
//! - `message` — streaming protocol frames in both directions.
//! - `order` — order side-channel request and response payloads.
//! - `net` — endpoint paths and URL derivation.
#![warn(missing_docs)]
pub mod error;
pub mod instrument;
pub mod message;
pub mod net;
pub mod order;
pub mod quote;
pub mod result;

pub use error::DeskError;
pub use instrument::InstrumentId;
pub use message::{ClientMessage, ServerMessage};
pub use quote::QuoteRecord;
pub use result::Result;
