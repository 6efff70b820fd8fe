//! Streaming transport session.
//!
//! `TransportSession` owns at most one physical link at a time and knows nothing
//! about instruments. Link threads report raw `LinkEvent`s over a channel; the
//! session folds them into its state machine and hands typed `SessionEvent`s to
//! the controller:
//!
//! - `Connecting -> Open` on handshake; the attempt counter resets to zero.
//! - `Connecting | Open -> Closed` on any failure or close; a retry is scheduled on
//!   a timer while the policy allows it, otherwise the session gives up.
//! - `Closed -> Connecting` when the retry timer fires (`fire_retry`) or on an
//!   explicit `open`.
//!
//! Every link gets a fresh `LinkId`; events from older links are discarded so a
//! slow-dying connection cannot disturb its successor.
pub mod link;
pub mod policy;

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, after, never, unbounded};
use log::{debug, error, info, warn};
use quotedesk_common::{ClientMessage, DeskError, Result, ServerMessage};
use strum::Display;

pub use link::WsConnector;
pub use policy::ReconnectPolicy;

/// Identifies one connection attempt.
pub type LinkId = u64;

/// Raw progress of a link, produced by a `Connector`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// Handshake completed.
    Opened,
    /// One inbound text frame, undecoded.
    Frame(String),
    /// The link is gone; carries a human-readable reason.
    Closed(String),
}

/// A `LinkEventKind` tagged with the link that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    /// Producing link.
    pub link: LinkId,
    /// What happened.
    pub kind: LinkEventKind,
}

/// Starts physical connections.
pub trait Connector: Send {
    /// Begins a connection attempt for `link` and returns its outbound frame queue.
    ///
    /// The implementation reports `Opened` once on handshake, then inbound `Frame`s,
    /// and finally exactly one `Closed`, also when the attempt itself fails. Dropping
    /// the returned sender asks the link to shut down.
    fn connect(&mut self, link: LinkId, events: Sender<LinkEvent>) -> Sender<String>;
}

/// Anything that can carry a client message to the server.
pub trait Outbound {
    /// Transmits `message` or reports why it could not.
    fn send(&mut self, message: &ClientMessage) -> Result<()>;
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Ready to send and receive.
    Open,
    /// No usable connection.
    Closed,
}

/// A scheduled reconnection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Ceiling from the policy.
    pub max_attempts: u32,
    /// Wait before the attempt starts.
    pub delay: Duration,
}

/// Connection-level event consumed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The link is open; resync is due.
    Opened,
    /// A decoded inbound message.
    Frame(ServerMessage),
    /// The link closed. `retry` is `None` once the reconnect budget is spent.
    Closed {
        /// Why the link closed.
        reason: String,
        /// The next scheduled attempt, if any.
        retry: Option<RetryPlan>,
    },
}

struct PendingRetry {
    plan: RetryPlan,
    timer: Receiver<Instant>,
}

/// One logical streaming session over successive physical links.
pub struct TransportSession {
    connector: Box<dyn Connector>,
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    link: LinkId,
    outbound: Option<Sender<String>>,
    retry: Option<PendingRetry>,
    exhausted: bool,
    events_tx: Sender<LinkEvent>,
    events_rx: Receiver<LinkEvent>,
}

impl TransportSession {
    /// Idle session; nothing happens until `open`.
    pub fn new(connector: Box<dyn Connector>, policy: ReconnectPolicy) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            connector,
            policy,
            state: ConnectionState::Closed,
            attempts: 0,
            link: 0,
            outbound: None,
            retry: None,
            exhausted: false,
            events_tx,
            events_rx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful handshake.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Id of the current (or last) link.
    pub fn link(&self) -> LinkId {
        self.link
    }

    /// The active reconnect policy.
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// `true` after the session gave up reconnecting.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The reconnect attempt waiting on its timer, if any.
    pub fn pending_retry(&self) -> Option<RetryPlan> {
        self.retry.as_ref().map(|pending| pending.plan)
    }

    /// Channel carrying raw link events, in arrival order.
    pub fn events(&self) -> &Receiver<LinkEvent> {
        &self.events_rx
    }

    /// Fires once when the pending retry is due; never fires when none is pending.
    pub fn retry_signal(&self) -> Receiver<Instant> {
        match &self.retry {
            Some(pending) => pending.timer.clone(),
            None => never(),
        }
    }

    /// Starts a connection attempt with a fresh reconnect budget.
    ///
    /// Ignored while a link is already connecting or open.
    pub fn open(&mut self) {
        if self.state != ConnectionState::Closed {
            debug!("open() ignored, session is {}", self.state);
            return;
        }
        self.attempts = 0;
        self.exhausted = false;
        self.retry = None;
        self.start_link();
    }

    /// Runs the scheduled reconnect attempt now. Returns `false` if none was pending.
    pub fn fire_retry(&mut self) -> bool {
        match self.retry.take() {
            Some(pending) => {
                info!(
                    "Reconnect attempt {}/{}",
                    pending.plan.attempt, pending.plan.max_attempts
                );
                self.start_link();
                true
            }
            None => false,
        }
    }

    /// Folds a raw link event into the state machine.
    ///
    /// Returns the session-level event to dispatch, or `None` when the event was
    /// stale, redundant or a malformed frame.
    pub fn handle(&mut self, event: LinkEvent) -> Option<SessionEvent> {
        if event.link != self.link {
            debug!(
                "Dropping event from stale link {} (current {})",
                event.link, self.link
            );
            return None;
        }

        match event.kind {
            LinkEventKind::Opened => {
                if self.state != ConnectionState::Connecting {
                    debug!("Ignoring open notification while {}", self.state);
                    return None;
                }
                self.state = ConnectionState::Open;
                self.attempts = 0;
                info!("Connected (link {})", self.link);
                Some(SessionEvent::Opened)
            }
            LinkEventKind::Frame(text) => {
                if self.state != ConnectionState::Open {
                    debug!("Ignoring frame received while {}", self.state);
                    return None;
                }
                match ServerMessage::decode(&text) {
                    Ok(message) => Some(SessionEvent::Frame(message)),
                    Err(e) => {
                        warn!("Dropping malformed frame ({}): {}", e, text);
                        None
                    }
                }
            }
            LinkEventKind::Closed(reason) => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                self.state = ConnectionState::Closed;
                self.outbound = None;
                warn!("Disconnected: {}", reason);
                let retry = self.schedule_retry();
                Some(SessionEvent::Closed { reason, retry })
            }
        }
    }

    /// Drops the current link without scheduling a reconnect.
    pub fn close(&mut self) {
        self.retry = None;
        self.outbound = None;
        // Orphan the running link so its trailing events are ignored.
        self.link += 1;
        self.state = ConnectionState::Closed;
        info!("Session closed");
    }

    fn start_link(&mut self) {
        self.link += 1;
        self.state = ConnectionState::Connecting;
        self.outbound = Some(self.connector.connect(self.link, self.events_tx.clone()));
    }

    fn schedule_retry(&mut self) -> Option<RetryPlan> {
        if !self.policy.allows(self.attempts) {
            self.exhausted = true;
            error!(
                "Giving up after {} reconnect attempts",
                self.policy.max_attempts
            );
            return None;
        }
        self.attempts += 1;
        let plan = RetryPlan {
            attempt: self.attempts,
            max_attempts: self.policy.max_attempts,
            delay: self.policy.delay_for(self.attempts),
        };
        info!(
            "Reconnecting in {:?} (attempt {}/{})",
            plan.delay, plan.attempt, plan.max_attempts
        );
        self.retry = Some(PendingRetry {
            plan,
            timer: after(plan.delay),
        });
        Some(plan)
    }
}

impl Outbound for TransportSession {
    fn send(&mut self, message: &ClientMessage) -> Result<()> {
        if self.state != ConnectionState::Open {
            warn!("Not sending {:?}: session is {}", message, self.state);
            return Err(DeskError::NotConnected);
        }
        let frame = message.encode()?;
        let outbound = self.outbound.as_ref().ok_or(DeskError::NotConnected)?;
        outbound.send(frame).map_err(|_| DeskError::NotConnected)?;
        debug!("Queued {:?}", message);
        Ok(())
    }
}
