//! Endpoint constants and URL derivation from the server origin.
//!
//! Both endpoints hang off one HTTP origin. The streaming URL swaps the scheme for
//! its WebSocket counterpart, keeping TLS when the origin uses it.
use url::Url;

use crate::error::DeskError;

/// Path of the quote streaming endpoint.
pub const STREAM_PATH: &str = "/ws";
/// Path of the market order endpoint.
pub const ORDER_PATH: &str = "/api/order/market";
/// Origin used when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// Streaming URL for `origin`: `http` becomes `ws`, `https` becomes `wss`.
pub fn stream_url(origin: &Url) -> Result<Url, DeskError> {
    let scheme = match origin.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(DeskError::Format(format!(
                "unsupported origin scheme '{other}'"
            )));
        }
    };
    let mut url = origin.join(STREAM_PATH)?;
    url.set_scheme(scheme)
        .map_err(|_| DeskError::Format(format!("cannot switch {origin} to {scheme}")))?;
    Ok(url)
}

/// Order endpoint URL for `origin`.
pub fn order_url(origin: &Url) -> Result<Url, DeskError> {
    Ok(origin.join(ORDER_PATH)?)
}
