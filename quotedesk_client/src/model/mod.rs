//! Session view-state owned by the controller.
//!
//! - `registry` — server-confirmed subscription set.
//! - `store` — latest quote per instrument and the update counter.
pub mod registry;
pub mod store;

pub use registry::{SubscribeRequest, SubscriptionRegistry};
pub use store::{QuoteStore, Statistics, Upsert};
