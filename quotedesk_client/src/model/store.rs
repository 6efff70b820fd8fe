//! Latest quote per instrument.
//!
//! Updates replace whole records; nothing is merged field by field. The update
//! counter counts every `upsert` for the life of the store and is never reset.
use std::collections::HashMap;

use quotedesk_common::{InstrumentId, QuoteRecord};

use super::registry::SubscriptionRegistry;

/// Whether an upsert created a row or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First quote for this instrument.
    Inserted,
    /// An existing record was replaced.
    Updated,
}

/// Figures shown in the dashboard header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Confirmed subscriptions.
    pub active_instruments: usize,
    /// Quote updates received since start.
    pub total_updates: u64,
}

/// Snapshot table keyed by instrument.
#[derive(Debug, Default)]
pub struct QuoteStore {
    quotes: HashMap<InstrumentId, QuoteRecord>,
    update_count: u64,
}

impl QuoteStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, replacing any previous one for the same instrument.
    pub fn upsert(&mut self, record: QuoteRecord) -> Upsert {
        self.update_count += 1;
        match self.quotes.insert(record.ticker.clone(), record) {
            Some(_) => Upsert::Updated,
            None => Upsert::Inserted,
        }
    }

    /// Drops the record for `id`, returning it if there was one.
    pub fn remove(&mut self, id: &InstrumentId) -> Option<QuoteRecord> {
        self.quotes.remove(id)
    }

    /// Latest record for `id`.
    pub fn get(&self, id: &InstrumentId) -> Option<&QuoteRecord> {
        self.quotes.get(id)
    }

    /// Number of instruments with a quote.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// `true` when no quote has been kept.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Total upserts since the store was created.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Records sorted by instrument.
    pub fn sorted(&self) -> Vec<&QuoteRecord> {
        let mut records: Vec<&QuoteRecord> = self.quotes.values().collect();
        records.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        records
    }

    /// Header statistics. The instrument count comes from `registry`, since a
    /// subscription may exist before its first quote.
    pub fn statistics(&self, registry: &SubscriptionRegistry) -> Statistics {
        Statistics {
            active_instruments: registry.len(),
            total_updates: self.update_count,
        }
    }
}
