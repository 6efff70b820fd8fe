//! Order side-channel payloads.
//!
//! Orders travel over a plain request/response endpoint, not the streaming link.
//! `Quantity` can only hold a positive integer, so an `OrderRequest` is valid by
//! construction once built.
use std::fmt;
use std::num::NonZeroU64;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::DeskError;
use crate::instrument::InstrumentId;

/// Order direction. Serialized as `Buy` / `Sell`.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive)]
pub enum Side {
    Buy,
    Sell,
}

/// Positive order size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU64);

impl Quantity {
    /// Parses user input. Missing, non-numeric, zero and negative values are rejected.
    pub fn parse(raw: &str) -> Result<Self, DeskError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeskError::InvalidQuantity(String::from(
                "quantity is required",
            )));
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| DeskError::InvalidQuantity(format!("'{trimmed}' is not a whole number")))?;
        Quantity::try_from(value)
    }

    /// The quantity as a plain integer.
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DeskError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .ok()
            .and_then(NonZeroU64::new)
            .map(Quantity)
            .ok_or_else(|| {
                DeskError::InvalidQuantity(String::from("quantity must be greater than zero"))
            })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body of a market order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Instrument to trade.
    pub ticker: InstrumentId,
    /// Buy or sell.
    pub side: Side,
    /// Number of units.
    pub quantity: Quantity,
}

/// Success payload of the order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderAck {
    /// Human-readable confirmation.
    pub message: String,
    /// Broker order id, when the endpoint reports one.
    #[serde(rename = "orderId", default)]
    pub order_id: Option<String>,
}

/// Raw envelope returned by the order endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    /// Whether the order was accepted.
    pub success: bool,
    /// Confirmation, present on success.
    #[serde(default)]
    pub data: Option<OrderAck>,
    /// Error description, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl OrderResponse {
    /// Splits the envelope into an acknowledgement or a business rejection.
    pub fn into_result(self) -> Result<OrderAck, DeskError> {
        match (self.success, self.data) {
            (true, Some(ack)) => Ok(ack),
            (true, None) => Err(DeskError::Format(String::from(
                "order accepted without confirmation data",
            ))),
            (false, _) => Err(DeskError::OrderRejected(
                self.error
                    .unwrap_or_else(|| String::from("no error description")),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_rejects_non_positive_and_garbage() {
        for raw in ["0", "-3", "abc", "", "  ", "2.5"] {
            assert!(
                matches!(Quantity::parse(raw), Err(DeskError::InvalidQuantity(_))),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(Quantity::parse(" 5 ").unwrap().get(), 5);
    }

    #[test]
    fn request_serializes_to_wire_shape() {
        let request = OrderRequest {
            ticker: InstrumentId::new("petr4").unwrap(),
            side: Side::Sell,
            quantity: Quantity::try_from(100).unwrap(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"ticker":"PETR4","side":"Sell","quantity":100}"#
        );
    }

    #[test]
    fn response_success_yields_ack() {
        let json = r#"{"success":true,"data":{"orderId":"A1","message":"Order sent"}}"#;
        let response: OrderResponse = serde_json::from_str(json).unwrap();
        let ack = response.into_result().unwrap();
        assert_eq!(ack.message, "Order sent");
        assert_eq!(ack.order_id.as_deref(), Some("A1"));
    }

    #[test]
    fn response_failure_is_a_rejection() {
        let json = r#"{"success":false,"error":"market closed"}"#;
        let response: OrderResponse = serde_json::from_str(json).unwrap();
        match response.into_result() {
            Err(DeskError::OrderRejected(reason)) => assert_eq!(reason, "market closed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(Side::Sell.to_string(), "Sell");
    }
}
