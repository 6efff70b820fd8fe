//! Order gateway over the request/response side-channel.
//!
//! The gateway validates locally, sends one request and maps the answer. It keeps
//! no state between calls: no retry, no idempotency key, no queue. Serializing
//! calls per instrument is the caller's job.
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use quotedesk_common::order::{OrderAck, OrderRequest, OrderResponse, Quantity, Side};
use quotedesk_common::{DeskError, InstrumentId, Result};
use reqwest::blocking::Client;
use url::Url;

/// Carries one order request to the endpoint and returns its raw answer.
pub trait OrderTransport: Send + Sync {
    /// Performs the exchange. Network and decoding failures map to `Transport`.
    fn post(&self, request: &OrderRequest) -> Result<OrderResponse>;
}

/// JSON-over-HTTP order transport.
pub struct HttpOrderTransport {
    client: Client,
    url: Url,
}

impl HttpOrderTransport {
    /// Transport posting to `url`, giving up on a response after `timeout`.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeskError::Transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

impl OrderTransport for HttpOrderTransport {
    fn post(&self, request: &OrderRequest) -> Result<OrderResponse> {
        debug!("POST {} {:?}", self.url, request);
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .map_err(|e| DeskError::Transport(e.to_string()))?;
        let status = response.status();
        response.json::<OrderResponse>().map_err(|e| {
            DeskError::Transport(format!("unreadable order response (HTTP {}): {}", status, e))
        })
    }
}

/// Validates and submits single orders.
#[derive(Clone)]
pub struct OrderGateway {
    transport: Arc<dyn OrderTransport>,
}

impl OrderGateway {
    /// Gateway over `transport`.
    pub fn new(transport: Arc<dyn OrderTransport>) -> Self {
        Self { transport }
    }

    /// Validates raw `quantity` input, then places the order.
    ///
    /// Invalid quantities fail with `InvalidQuantity` before any network traffic.
    pub fn submit(&self, ticker: &InstrumentId, side: Side, quantity: &str) -> Result<OrderAck> {
        let quantity = Quantity::parse(quantity)?;
        self.place(ticker, side, quantity)
    }

    /// Places an already validated order.
    ///
    /// Resolves to the acknowledgement, `OrderRejected` for a business failure, or
    /// `Transport` for a network failure.
    pub fn place(&self, ticker: &InstrumentId, side: Side, quantity: Quantity) -> Result<OrderAck> {
        let request = OrderRequest {
            ticker: ticker.clone(),
            side,
            quantity,
        };
        info!("Sending order: {} {} {}", side, quantity, ticker);
        self.transport.post(&request)?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Counts calls and answers with a canned response.
    struct CannedTransport {
        calls: Mutex<Vec<OrderRequest>>,
        answer: fn() -> Result<OrderResponse>,
    }

    impl CannedTransport {
        fn new(answer: fn() -> Result<OrderResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                answer,
            })
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl OrderTransport for CannedTransport {
        fn post(&self, request: &OrderRequest) -> Result<OrderResponse> {
            self.calls.lock().unwrap().push(request.clone());
            (self.answer)()
        }
    }

    fn accepted() -> Result<OrderResponse> {
        Ok(OrderResponse {
            success: true,
            data: Some(OrderAck {
                message: String::from("buy order for 5 PETR4 sent"),
                order_id: Some(String::from("42")),
            }),
            error: None,
        })
    }

    fn rejected() -> Result<OrderResponse> {
        Ok(OrderResponse {
            success: false,
            data: None,
            error: Some(String::from("insufficient margin")),
        })
    }

    fn unreachable_host() -> Result<OrderResponse> {
        Err(DeskError::Transport(String::from("connection refused")))
    }

    fn petr4() -> InstrumentId {
        InstrumentId::new("PETR4").unwrap()
    }

    #[test]
    fn invalid_quantities_never_reach_the_network() {
        let transport = CannedTransport::new(accepted);
        let gateway = OrderGateway::new(transport.clone());

        for raw in ["0", "-3", "abc", ""] {
            assert!(matches!(
                gateway.submit(&petr4(), Side::Buy, raw),
                Err(DeskError::InvalidQuantity(_))
            ));
        }
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn valid_order_makes_exactly_one_call() {
        let transport = CannedTransport::new(accepted);
        let gateway = OrderGateway::new(transport.clone());

        let ack = gateway.submit(&petr4(), Side::Buy, "5").unwrap();
        assert_eq!(ack.order_id.as_deref(), Some("42"));
        assert_eq!(transport.calls(), 1);

        let sent = transport.calls.lock().unwrap()[0].clone();
        assert_eq!(sent.quantity.get(), 5);
        assert_eq!(sent.side, Side::Buy);
    }

    #[test]
    fn business_rejection_and_network_failure_stay_distinct() {
        let gateway = OrderGateway::new(CannedTransport::new(rejected));
        match gateway.submit(&petr4(), Side::Sell, "1") {
            Err(DeskError::OrderRejected(reason)) => assert_eq!(reason, "insufficient margin"),
            other => panic!("unexpected result: {other:?}"),
        }

        let transport = CannedTransport::new(unreachable_host);
        let gateway = OrderGateway::new(transport.clone());
        assert!(matches!(
            gateway.submit(&petr4(), Side::Sell, "1"),
            Err(DeskError::Transport(_))
        ));
        assert_eq!(transport.calls(), 1);
    }
}
