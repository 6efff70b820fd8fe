//! Streaming protocol messages exchanged over the WebSocket link.
//!
//! Every frame is a JSON object tagged by a `type` field. Client messages are a
//! closed set. Server messages are decoded into a closed set plus an explicit
//! `Unknown` fallback so newer servers can add message kinds without breaking
//! older clients.
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

use crate::error::DeskError;
use crate::instrument::InstrumentId;
use crate::quote::QuoteRecord;

/// Discriminator field name used by every frame.
pub const TYPE_FIELD: &str = "type";

/// Message sent by the client.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the server to start streaming an instrument.
    Subscribe { ticker: InstrumentId },
    /// Ask the server to stop streaming an instrument.
    Unsubscribe { ticker: InstrumentId },
    /// Request the authoritative subscription list.
    GetSubscribed,
}

impl ClientMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, DeskError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Message kinds this client understands.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ServerMessageKind {
    QuoteUpdate,
    SubscriptionConfirmed,
    UnsubscriptionConfirmed,
    SubscribedTickers,
}

/// Message pushed by the server.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Fresh snapshot for one instrument.
    QuoteUpdate { data: QuoteRecord },
    /// The server accepted a subscribe request.
    SubscriptionConfirmed { ticker: InstrumentId },
    /// The server accepted an unsubscribe request.
    UnsubscriptionConfirmed { ticker: InstrumentId },
    /// Full authoritative subscription list. Blank or non-string entries are skipped.
    SubscribedTickers {
        #[serde(deserialize_with = "valid_instruments")]
        tickers: Vec<InstrumentId>,
    },
    /// A well-formed frame whose `type` this client does not know. Carries the tag.
    #[serde(skip_deserializing)]
    Unknown(String),
}

impl ServerMessage {
    /// Decode a text frame.
    ///
    /// Fails on non-JSON input, a missing or non-string `type`, or a known type with
    /// an invalid body. An unrecognized `type` is not an error.
    pub fn decode(text: &str) -> Result<ServerMessage, DeskError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| DeskError::Format(String::from("frame has no string `type` field")))?;

        if kind.parse::<ServerMessageKind>().is_err() {
            return Ok(ServerMessage::Unknown(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Kind of a recognized message, `None` for `Unknown`.
    pub fn kind(&self) -> Option<ServerMessageKind> {
        match self {
            ServerMessage::QuoteUpdate { .. } => Some(ServerMessageKind::QuoteUpdate),
            ServerMessage::SubscriptionConfirmed { .. } => {
                Some(ServerMessageKind::SubscriptionConfirmed)
            }
            ServerMessage::UnsubscriptionConfirmed { .. } => {
                Some(ServerMessageKind::UnsubscriptionConfirmed)
            }
            ServerMessage::SubscribedTickers { .. } => Some(ServerMessageKind::SubscribedTickers),
            ServerMessage::Unknown(_) => None,
        }
    }
}

fn valid_instruments<'de, D>(deserializer: D) -> Result<Vec<InstrumentId>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry.as_str().map(InstrumentId::new) {
            Some(Ok(id)) => Some(id),
            _ => {
                warn!("Skipping invalid entry {} in subscription list", entry);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(token: &str) -> InstrumentId {
        InstrumentId::new(token).unwrap()
    }

    #[test]
    fn client_messages_use_snake_case_tags() {
        let subscribe = ClientMessage::Subscribe { ticker: id("petr4") };
        assert_eq!(
            subscribe.encode().unwrap(),
            r#"{"type":"subscribe","ticker":"PETR4"}"#
        );
        assert_eq!(
            ClientMessage::GetSubscribed.encode().unwrap(),
            r#"{"type":"get_subscribed"}"#
        );
    }

    #[test]
    fn decodes_quote_update() {
        let frame = r#"{"type":"quote_update","data":{"ticker":"VALE3","lastPrice":61.20,
            "change":-0.30,"changePercent":-0.49,"volume":1200,"timestamp":"10:00:00"}}"#;
        match ServerMessage::decode(frame).unwrap() {
            ServerMessage::QuoteUpdate { data } => {
                assert_eq!(data.ticker, id("VALE3"));
                assert_eq!(data.last_price, 61.20);
                assert_eq!(data.change_percent, -0.49);
                assert_eq!(data.volume, Some(1200));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn decodes_confirmations_and_list() {
        let confirmed = ServerMessage::decode(r#"{"type":"subscription_confirmed","ticker":"petr4"}"#)
            .unwrap();
        assert_eq!(
            confirmed,
            ServerMessage::SubscriptionConfirmed { ticker: id("PETR4") }
        );

        let list = ServerMessage::decode(r#"{"type":"subscribed_tickers","tickers":["A","b"]}"#)
            .unwrap();
        assert_eq!(
            list,
            ServerMessage::SubscribedTickers {
                tickers: vec![id("A"), id("B")]
            }
        );
        assert_eq!(list.kind(), Some(ServerMessageKind::SubscribedTickers));
    }

    #[test]
    fn subscription_list_skips_invalid_entries() {
        let list = ServerMessage::decode(
            r#"{"type":"subscribed_tickers","tickers":["PETR4","  ",7,null,"vale3"]}"#,
        )
        .unwrap();
        assert_eq!(
            list,
            ServerMessage::SubscribedTickers {
                tickers: vec![id("PETR4"), id("VALE3")]
            }
        );
    }

    #[test]
    fn quote_update_tolerates_relayed_nulls_and_float_volume() {
        let frame = r#"{"type":"quote_update","data":{"ticker":"PETR4","lastPrice":37.9,
            "change":null,"changePercent":null,"volume":1200.0,"timestamp":"t"}}"#;
        match ServerMessage::decode(frame).unwrap() {
            ServerMessage::QuoteUpdate { data } => {
                assert_eq!(data.change, 0.0);
                assert_eq!(data.change_percent, 0.0);
                assert_eq!(data.volume, Some(1200));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_kept_as_fallback() {
        let message = ServerMessage::decode(r#"{"type":"heartbeat","seq":4}"#).unwrap();
        assert_eq!(message, ServerMessage::Unknown(String::from("heartbeat")));
        assert_eq!(message.kind(), None);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            ServerMessage::decode("not json"),
            Err(DeskError::SerdeJson(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"ticker":"PETR4"}"#),
            Err(DeskError::Format(_))
        ));
        assert!(ServerMessage::decode(r#"{"type":"subscription_confirmed"}"#).is_err());
    }
}
