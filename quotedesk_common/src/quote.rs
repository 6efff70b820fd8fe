//! Quote payload pushed by the server.
//!
//! Quotes arrive as the `data` object of a `quote_update` message. Field names follow
//! the server's camelCase JSON. The server relays upstream values untouched, so
//! `change` and `changePercent` may be absent or `null` (read as zero) and `volume`
//! may be absent, `null`, or any JSON number.
use serde::{Deserialize, Deserializer, Serialize};

use crate::instrument::InstrumentId;

/// Latest known snapshot for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    /// Instrument the quote belongs to.
    pub ticker: InstrumentId,
    /// Last traded price.
    pub last_price: f64,
    /// Absolute change against the reference price.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub change: f64,
    /// Percent change against the reference price.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub change_percent: f64,
    /// Traded volume, when the feed reports one.
    #[serde(default, deserialize_with = "any_number_volume")]
    pub volume: Option<u64>,
    /// Server-supplied timestamp, kept verbatim.
    pub timestamp: String,
    /// Best bid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    /// Best ask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
}

impl QuoteRecord {
    /// `true` when the instrument is flat or up on the session.
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integer and floating point volumes; negative or non-finite values read as unknown.
fn any_number_volume<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let volume = Option::<f64>::deserialize(deserializer)?;
    Ok(volume
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = r#"{"ticker":"vale3","lastPrice":61.2,"timestamp":"2025-01-02 10:00:00.000"}"#;
        let quote: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(quote.ticker.as_str(), "VALE3");
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);
        assert_eq!(quote.volume, None);
        assert!(quote.is_up());
    }

    #[test]
    fn null_volume_is_accepted() {
        let json = r#"{"ticker":"PETR4","lastPrice":37.9,"change":-0.1,"changePercent":-0.26,
            "volume":null,"timestamp":"t","bid":37.89,"ask":37.91}"#;
        let quote: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(quote.volume, None);
        assert_eq!(quote.bid, Some(37.89));
        assert!(!quote.is_up());
    }

    #[test]
    fn null_changes_read_as_zero() {
        let json = r#"{"ticker":"WINV25","lastPrice":128500.0,"change":null,
            "changePercent":null,"volume":null,"timestamp":"t"}"#;
        let quote: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);
        assert_eq!(quote.volume, None);
    }

    #[test]
    fn float_volume_is_accepted() {
        let json = r#"{"ticker":"PETR4","lastPrice":37.9,"volume":1200.0,"timestamp":"t"}"#;
        let quote: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(quote.volume, Some(1200));

        let json = r#"{"ticker":"PETR4","lastPrice":37.9,"volume":1500,"timestamp":"t"}"#;
        let quote: QuoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(quote.volume, Some(1500));
    }
}
