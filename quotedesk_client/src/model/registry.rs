//! Server-confirmed subscription set.
//!
//! Requests and confirmations are decoupled: `request_*` only emits messages, and
//! membership changes exclusively on confirmations from the server or an
//! authoritative list. The set therefore never shows an instrument the server has
//! not accepted.
use std::collections::BTreeSet;

use log::debug;
use quotedesk_common::{ClientMessage, InstrumentId, Result};

use crate::transport::Outbound;

/// Outcome of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeRequest {
    /// The request went out.
    Sent,
    /// Already a confirmed member; nothing was sent.
    AlreadySubscribed,
}

/// Instruments the server has confirmed.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    members: BTreeSet<InstrumentId>,
}

impl SubscriptionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the server to subscribe `id` unless it is already a member.
    pub fn request_subscribe<O: Outbound>(
        &self,
        id: &InstrumentId,
        outbound: &mut O,
    ) -> Result<SubscribeRequest> {
        if self.members.contains(id) {
            debug!("{} already subscribed, not asking again", id);
            return Ok(SubscribeRequest::AlreadySubscribed);
        }
        outbound.send(&ClientMessage::Subscribe { ticker: id.clone() })?;
        Ok(SubscribeRequest::Sent)
    }

    /// Asks the server to unsubscribe `id`, member or not.
    pub fn request_unsubscribe<O: Outbound>(
        &self,
        id: &InstrumentId,
        outbound: &mut O,
    ) -> Result<()> {
        outbound.send(&ClientMessage::Unsubscribe { ticker: id.clone() })
    }

    /// Server confirmed a subscription. Returns `true` if `id` was not yet a member.
    pub fn confirm_subscribed(&mut self, id: InstrumentId) -> bool {
        self.members.insert(id)
    }

    /// Server confirmed an unsubscription. Returns `true` if `id` was a member.
    pub fn confirm_unsubscribed(&mut self, id: &InstrumentId) -> bool {
        self.members.remove(id)
    }

    /// Replaces membership with the server's authoritative list.
    pub fn replace_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = InstrumentId>,
    {
        self.members = ids.into_iter().collect();
    }

    /// Whether `id` is a confirmed member.
    pub fn contains(&self, id: &InstrumentId) -> bool {
        self.members.contains(id)
    }

    /// Number of confirmed members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &InstrumentId> {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quotedesk_common::DeskError;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<ClientMessage>,
        connected: bool,
    }

    impl Outbound for Recorder {
        fn send(&mut self, message: &ClientMessage) -> Result<()> {
            if !self.connected {
                return Err(DeskError::NotConnected);
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn connected() -> Recorder {
        Recorder {
            connected: true,
            ..Recorder::default()
        }
    }

    fn id(token: &str) -> InstrumentId {
        InstrumentId::new(token).unwrap()
    }

    #[test]
    fn requests_do_not_touch_membership() {
        let registry = SubscriptionRegistry::new();
        let mut out = connected();
        assert_eq!(
            registry.request_subscribe(&id("PETR4"), &mut out).unwrap(),
            SubscribeRequest::Sent
        );
        registry.request_unsubscribe(&id("VALE3"), &mut out).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            out.sent,
            vec![
                ClientMessage::Subscribe { ticker: id("PETR4") },
                ClientMessage::Unsubscribe { ticker: id("VALE3") },
            ]
        );
    }

    #[test]
    fn subscribe_intent_is_idempotent_for_members() {
        let mut registry = SubscriptionRegistry::new();
        registry.confirm_subscribed(id("PETR4"));
        let mut out = connected();
        assert_eq!(
            registry.request_subscribe(&id("petr4"), &mut out).unwrap(),
            SubscribeRequest::AlreadySubscribed
        );
        assert!(out.sent.is_empty());
    }

    #[test]
    fn unsubscribe_is_sent_even_for_non_members() {
        let registry = SubscriptionRegistry::new();
        let mut out = connected();
        registry.request_unsubscribe(&id("ITUB4"), &mut out).unwrap();
        assert_eq!(out.sent.len(), 1);
    }

    #[test]
    fn send_failure_propagates() {
        let registry = SubscriptionRegistry::new();
        let mut out = Recorder::default();
        assert!(matches!(
            registry.request_subscribe(&id("PETR4"), &mut out),
            Err(DeskError::NotConnected)
        ));
    }

    #[test]
    fn replace_all_discards_previous_members() {
        let mut registry = SubscriptionRegistry::new();
        registry.confirm_subscribed(id("A"));
        registry.confirm_subscribed(id("B"));
        registry.replace_all(vec![id("C"), id("B"), id("C")]);
        let members: Vec<&str> = registry.iter().map(InstrumentId::as_str).collect();
        assert_eq!(members, vec!["B", "C"]);
    }

    #[derive(Debug, Clone)]
    enum Step {
        RequestSubscribe(usize),
        RequestUnsubscribe(usize),
        ConfirmSubscribed(usize),
        ConfirmUnsubscribed(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0..4usize).prop_map(Step::RequestSubscribe),
            (0..4usize).prop_map(Step::RequestUnsubscribe),
            (0..4usize).prop_map(Step::ConfirmSubscribed),
            (0..4usize).prop_map(Step::ConfirmUnsubscribed),
        ]
    }

    proptest! {
        #[test]
        fn membership_follows_confirmations_only(steps in prop::collection::vec(step(), 0..64)) {
            let pool = ["PETR4", "VALE3", "ITUB4", "BBDC4"].map(id);
            let mut registry = SubscriptionRegistry::new();
            let mut out = connected();
            let mut expected = BTreeSet::new();

            for step in steps {
                match step {
                    Step::RequestSubscribe(i) => {
                        registry.request_subscribe(&pool[i], &mut out).unwrap();
                    }
                    Step::RequestUnsubscribe(i) => {
                        registry.request_unsubscribe(&pool[i], &mut out).unwrap();
                    }
                    Step::ConfirmSubscribed(i) => {
                        registry.confirm_subscribed(pool[i].clone());
                        expected.insert(pool[i].clone());
                    }
                    Step::ConfirmUnsubscribed(i) => {
                        registry.confirm_unsubscribed(&pool[i]);
                        expected.remove(&pool[i]);
                    }
                }
                let members: BTreeSet<InstrumentId> = registry.iter().cloned().collect();
                prop_assert_eq!(&members, &expected);
            }
        }
    }
}
