//! Client session core of the quote desk.
//!
//! The crate keeps a live streaming session to the dashboard server and maintains
//! the client-side view of it: which instruments are subscribed, the latest quote
//! per instrument, and market orders submitted over HTTP. `SessionController` ties
//! the pieces together; the `quotedesk` binary is a thin stdin/stdout shell around it.
#![warn(missing_docs)]
pub mod args;
pub mod command;
pub mod config;
pub mod controller;
pub mod model;
pub mod notice;
pub mod order;
pub mod transport;

pub use controller::{OrderOutcome, SessionController};
pub use notice::{Notice, NoticeKind};
