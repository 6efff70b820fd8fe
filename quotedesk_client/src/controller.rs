//! Session controller.
//!
//! The controller is the only owner of the subscription registry and the quote
//! store, and the only place where they change. Everything arrives as an event on
//! one thread:
//!
//! - link events from the transport, folded into `SessionEvent`s;
//! - the reconnect timer;
//! - user commands;
//! - order outcomes coming back from short-lived worker threads;
//! - shutdown.
//!
//! Crossbeam `select!` multiplexes the sources in `run`; `pump` drains whatever is
//! already queued without blocking.
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::thread;

use crossbeam_channel::{Receiver, Sender, never, select, unbounded};
use log::{debug, info, warn};
use quotedesk_common::instrument::Preset;
use quotedesk_common::order::{OrderAck, Quantity, Side};
use quotedesk_common::{ClientMessage, DeskError, InstrumentId, Result, ServerMessage};

use crate::command::UserCommand;
use crate::model::{QuoteStore, Statistics, SubscribeRequest, SubscriptionRegistry, Upsert};
use crate::notice::{Notice, NoticeKind};
use crate::order::OrderGateway;
use crate::transport::{LinkEvent, Outbound, SessionEvent, TransportSession};

/// Result of one order submission, delivered back to the controller thread.
#[derive(Debug)]
pub struct OrderOutcome {
    /// Instrument the order was for.
    pub ticker: InstrumentId,
    /// Direction of the order.
    pub side: Side,
    /// Acknowledgement or failure.
    pub result: Result<OrderAck>,
}

/// Wires transport, registry, store and order gateway together.
pub struct SessionController {
    transport: TransportSession,
    registry: SubscriptionRegistry,
    quotes: QuoteStore,
    gateway: OrderGateway,
    notices: Sender<Notice>,
    outcomes_tx: Sender<OrderOutcome>,
    outcomes_rx: Receiver<OrderOutcome>,
    in_flight: HashSet<InstrumentId>,
    watchlist: Vec<InstrumentId>,
}

impl SessionController {
    /// Controller over an idle transport. Notices are published on `notices`.
    pub fn new(transport: TransportSession, gateway: OrderGateway, notices: Sender<Notice>) -> Self {
        let (outcomes_tx, outcomes_rx) = unbounded();
        Self {
            transport,
            registry: SubscriptionRegistry::new(),
            quotes: QuoteStore::new(),
            gateway,
            notices,
            outcomes_tx,
            outcomes_rx,
            in_flight: HashSet::new(),
            watchlist: Vec::new(),
        }
    }

    /// Instruments to request once the first authoritative list has been applied.
    pub fn with_watchlist(mut self, watchlist: Vec<InstrumentId>) -> Self {
        self.watchlist = watchlist;
        self
    }

    /// Confirmed subscriptions.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Latest quotes.
    pub fn quotes(&self) -> &QuoteStore {
        &self.quotes
    }

    /// The streaming transport.
    pub fn transport(&self) -> &TransportSession {
        &self.transport
    }

    /// Mutable access to the transport, e.g. to fire a due retry.
    pub fn transport_mut(&mut self) -> &mut TransportSession {
        &mut self.transport
    }

    /// Header statistics.
    pub fn statistics(&self) -> Statistics {
        self.quotes.statistics(&self.registry)
    }

    /// Whether an order for `ticker` is awaiting its outcome.
    pub fn has_order_in_flight(&self, ticker: &InstrumentId) -> bool {
        self.in_flight.contains(ticker)
    }

    /// Order outcomes waiting to be handled.
    pub fn order_outcomes(&self) -> &Receiver<OrderOutcome> {
        &self.outcomes_rx
    }

    /// Starts the first connection attempt.
    pub fn start(&mut self) {
        self.transport.open();
    }

    /// Runs the event loop until `quit`, shutdown, or the shutdown sender is dropped.
    ///
    /// A closed command source only stops command intake; streaming continues.
    pub fn run(mut self, commands: Receiver<UserCommand>, shutdown: Receiver<()>) -> Result<()> {
        let events = self.transport.events().clone();
        let outcomes = self.outcomes_rx.clone();
        let mut commands = commands;
        self.start();

        loop {
            let retry = self.transport.retry_signal();
            select! {
                recv(events) -> event => match event {
                    Ok(event) => self.handle_link_event(event),
                    Err(e) => {
                        return Err(DeskError::Transport(format!("link events closed: {}", e)));
                    }
                },
                recv(retry) -> _ => {
                    self.transport.fire_retry();
                },
                recv(commands) -> command => match command {
                    Ok(command) => {
                        if self.handle_command(command).is_break() {
                            break;
                        }
                    }
                    Err(_) => {
                        debug!("Command source closed, streaming continues");
                        commands = never();
                    }
                },
                recv(outcomes) -> outcome => {
                    if let Ok(outcome) = outcome {
                        self.handle_order_outcome(outcome);
                    }
                },
                recv(shutdown) -> _ => {
                    info!("Shutdown requested");
                    break;
                },
            }
        }

        self.transport.close();
        Ok(())
    }

    /// Handles every event already queued, without blocking. Returns how many.
    pub fn pump(&mut self) -> usize {
        let events = self.transport.events().clone();
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_link_event(event);
            handled += 1;
        }
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.handle_order_outcome(outcome);
            handled += 1;
        }
        handled
    }

    /// Feeds a raw link event through the transport state machine.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        if let Some(event) = self.transport.handle(event) {
            self.handle_session_event(event);
        }
    }

    /// Reacts to connection-level events.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened => {
                self.notify(NoticeKind::Success, "Connected to server");
                // Subscriptions are not assumed to survive a disconnect.
                if let Err(e) = self.transport.send(&ClientMessage::GetSubscribed) {
                    self.report_send_failure(e);
                }
            }
            SessionEvent::Frame(message) => self.dispatch(message),
            SessionEvent::Closed {
                retry: Some(plan), ..
            } => self.notify(
                NoticeKind::Warning,
                format!(
                    "Trying to reconnect... ({}/{})",
                    plan.attempt, plan.max_attempts
                ),
            ),
            SessionEvent::Closed { retry: None, .. } => self.notify(
                NoticeKind::Error,
                "Reconnection failed. Use 'reconnect' to try again.",
            ),
        }
    }

    /// Applies one inbound message to the view state.
    pub fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::QuoteUpdate { data } => {
                debug!(
                    "QUOTE: {} Price={:.4} Change={:+.2} ({:+.2}%) Time={}",
                    data.ticker, data.last_price, data.change, data.change_percent, data.timestamp
                );
                let ticker = data.ticker.clone();
                if self.quotes.upsert(data) == Upsert::Inserted {
                    info!("First quote for {}", ticker);
                }
            }
            ServerMessage::SubscriptionConfirmed { ticker } => {
                let message = format!("{} added", ticker);
                self.registry.confirm_subscribed(ticker);
                self.notify(NoticeKind::Success, message);
            }
            ServerMessage::UnsubscriptionConfirmed { ticker } => {
                self.registry.confirm_unsubscribed(&ticker);
                self.quotes.remove(&ticker);
                self.notify(NoticeKind::Info, format!("{} removed", ticker));
            }
            ServerMessage::SubscribedTickers { tickers } => {
                self.registry.replace_all(tickers);
                info!("Resynced {} subscriptions", self.registry.len());
                self.apply_watchlist();
            }
            ServerMessage::Unknown(kind) => {
                warn!("Ignoring message with unrecognized type '{}'", kind);
            }
        }
    }

    /// Executes a user command. `Break` means the user asked to quit.
    pub fn handle_command(&mut self, command: UserCommand) -> ControlFlow<()> {
        match command {
            UserCommand::Add(raw) => self.add_instrument(&raw),
            UserCommand::Remove(raw) => self.remove_instrument(&raw),
            UserCommand::Preset(preset) => self.subscribe_preset(preset),
            UserCommand::Order {
                ticker,
                side,
                quantity,
            } => self.place_order(&ticker, side, &quantity),
            UserCommand::Stats => {
                let stats = self.statistics();
                self.notify(
                    NoticeKind::Info,
                    format!(
                        "Active instruments: {} | Updates: {} | Connection: {}",
                        stats.active_instruments,
                        stats.total_updates,
                        self.transport.state()
                    ),
                );
            }
            UserCommand::Quotes => self.log_quotes(),
            UserCommand::Reconnect => self.transport.open(),
            UserCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Requests a subscription for user input `raw`.
    pub fn add_instrument(&mut self, raw: &str) {
        let Some(id) = self.parse_instrument(raw) else {
            return;
        };
        match self.registry.request_subscribe(&id, &mut self.transport) {
            Ok(SubscribeRequest::Sent) => debug!("Subscribe requested for {}", id),
            Ok(SubscribeRequest::AlreadySubscribed) => self.notify(
                NoticeKind::Warning,
                format!("{} is already being monitored", id),
            ),
            Err(e) => self.report_send_failure(e),
        }
    }

    /// Requests removal of user input `raw`.
    pub fn remove_instrument(&mut self, raw: &str) {
        let Some(id) = self.parse_instrument(raw) else {
            return;
        };
        if let Err(e) = self.registry.request_unsubscribe(&id, &mut self.transport) {
            self.report_send_failure(e);
        }
    }

    /// Requests every preset instrument that is not already subscribed.
    pub fn subscribe_preset(&mut self, preset: Preset) {
        for id in preset.instruments() {
            if let Err(e) = self.registry.request_subscribe(&id, &mut self.transport) {
                self.report_send_failure(e);
            }
        }
    }

    /// Validates and submits an order on a worker thread.
    ///
    /// Only one order per instrument may be outstanding; its outcome comes back
    /// through `order_outcomes`.
    pub fn place_order(&mut self, raw_ticker: &str, side: Side, raw_quantity: &str) {
        let Some(ticker) = self.parse_instrument(raw_ticker) else {
            return;
        };
        if self.in_flight.contains(&ticker) {
            self.notify(
                NoticeKind::Warning,
                format!("An order for {} is still pending", ticker),
            );
            return;
        }
        let quantity = match Quantity::parse(raw_quantity) {
            Ok(quantity) => quantity,
            Err(e) => {
                debug!("Rejected order input: {}", e);
                self.notify(NoticeKind::Warning, "Quantity must be greater than zero");
                return;
            }
        };

        self.in_flight.insert(ticker.clone());
        let gateway = self.gateway.clone();
        let outcomes = self.outcomes_tx.clone();
        thread::spawn(move || {
            let result = gateway.place(&ticker, side, quantity);
            if outcomes
                .send(OrderOutcome {
                    ticker,
                    side,
                    result,
                })
                .is_err()
            {
                debug!("Order outcome arrived after the session ended");
            }
        });
    }

    /// Releases the instrument and reports the outcome.
    pub fn handle_order_outcome(&mut self, outcome: OrderOutcome) {
        self.in_flight.remove(&outcome.ticker);
        match outcome.result {
            Ok(ack) => {
                if let Some(order_id) = &ack.order_id {
                    info!("{} order for {} accepted as {}", outcome.side, outcome.ticker, order_id);
                }
                self.notify(NoticeKind::Success, ack.message);
            }
            Err(DeskError::OrderRejected(reason)) => {
                self.notify(NoticeKind::Error, format!("Error: {}", reason));
            }
            Err(DeskError::Transport(reason)) => {
                self.notify(NoticeKind::Error, format!("Connection error: {}", reason));
            }
            Err(e) => self.notify(NoticeKind::Error, e.to_string()),
        }
    }

    /// Entries that could not be sent stay queued for the next authoritative list.
    fn apply_watchlist(&mut self) {
        let mut pending = std::mem::take(&mut self.watchlist).into_iter();
        while let Some(id) = pending.next() {
            if let Err(e) = self.registry.request_subscribe(&id, &mut self.transport) {
                self.watchlist.push(id);
                self.watchlist.extend(pending);
                self.report_send_failure(e);
                return;
            }
        }
    }

    /// Watchlist entries not yet requested.
    pub fn pending_watchlist(&self) -> &[InstrumentId] {
        &self.watchlist
    }

    fn parse_instrument(&mut self, raw: &str) -> Option<InstrumentId> {
        match InstrumentId::new(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.notify(NoticeKind::Warning, "Enter a valid ticker");
                None
            }
        }
    }

    fn log_quotes(&self) {
        if self.quotes.is_empty() {
            info!("No quotes yet");
            return;
        }
        for quote in self.quotes.sorted() {
            let volume = quote
                .volume
                .map(|v| v.to_string())
                .unwrap_or_else(|| String::from("-"));
            info!(
                "{:<8} {:>12.4} {:+.2} ({:+.2}%) Vol={} Time={}",
                quote.ticker.as_str(),
                quote.last_price,
                quote.change,
                quote.change_percent,
                volume,
                quote.timestamp
            );
        }
    }

    fn report_send_failure(&mut self, error: DeskError) {
        match error {
            DeskError::NotConnected => self.notify(NoticeKind::Error, "Not connected to server"),
            other => self.notify(NoticeKind::Error, other.to_string()),
        }
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice::new(kind, message);
        debug!("Notice: {}", notice);
        if self.notices.send(notice).is_err() {
            debug!("Notice dropped, nobody is listening");
        }
    }
}
