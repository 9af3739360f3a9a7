use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

use sportshub_core::AggregateId;
use sportshub_events::EventEnvelope;
use sportshub_inventory::{InventoryEvent, ItemId, ITEM_AGGREGATE_TYPE};

use crate::event_store::{EventStore, EventStoreError};

/// An item at or below the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockItem {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Error)]
pub enum LowStockWatchError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("poisoned watch state")]
    Poisoned,

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

#[derive(Debug, Default)]
struct WatchState {
    cursors: HashMap<AggregateId, u64>,
    items: HashMap<ItemId, LowStockItem>,
    /// First-seen order, so listings follow insertion order.
    order: Vec<ItemId>,
}

/// Tracks item quantities from published inventory envelopes and warns when an
/// item drops to or below the threshold.
///
/// Idempotent for at-least-once delivery (per-stream cursor); envelopes of
/// other aggregate types are ignored. Disposable: `catch_up` rebuilds it from
/// the store.
#[derive(Debug)]
pub struct LowStockWatch {
    threshold: i64,
    state: RwLock<WatchState>,
}

impl LowStockWatch {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            state: RwLock::new(WatchState::default()),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Items currently at or below the threshold, in insertion order.
    pub fn low_stock(&self) -> Vec<LowStockItem> {
        let Ok(state) = self.state.read() else {
            return Vec::new();
        };
        state
            .order
            .iter()
            .filter_map(|id| state.items.get(id))
            .filter(|item| item.quantity <= self.threshold)
            .cloned()
            .collect()
    }

    /// Replay every committed inventory event. Already-seen events are skipped.
    pub fn catch_up<S: EventStore>(&self, store: &S) -> Result<usize, LowStockWatchError> {
        let events = store.load_all(ITEM_AGGREGATE_TYPE)?;
        for stored in &events {
            self.apply_envelope(&stored.to_envelope())?;
        }
        Ok(events.len())
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), LowStockWatchError> {
        if !envelope.is_from(ITEM_AGGREGATE_TYPE) {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| LowStockWatchError::Poisoned)?;

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = state.cursors.get(&aggregate_id).copied().unwrap_or(0);

        if seq == 0 {
            return Err(LowStockWatchError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay.
            return Ok(());
        }
        if last != 0 && seq != last + 1 {
            return Err(LowStockWatchError::NonMonotonicSequence { last, found: seq });
        }

        let event: InventoryEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| LowStockWatchError::Deserialize(e.to_string()))?;

        match event {
            InventoryEvent::ItemAdded(e) => {
                if e.quantity <= self.threshold {
                    warn!(item_id = %e.item_id, name = %e.name, quantity = e.quantity, threshold = self.threshold, "item added with low stock");
                }
                if !state.items.contains_key(&e.item_id) {
                    state.order.push(e.item_id);
                }
                state.items.insert(
                    e.item_id,
                    LowStockItem {
                        item_id: e.item_id,
                        name: e.name,
                        quantity: e.quantity,
                    },
                );
            }
            InventoryEvent::QuantityAdjusted(e) => {
                let WatchState { items, order, .. } = &mut *state;
                let item = items.entry(e.item_id).or_insert_with(|| {
                    order.push(e.item_id);
                    LowStockItem {
                        item_id: e.item_id,
                        name: String::new(),
                        quantity: e.quantity_after - e.delta,
                    }
                });

                let crossed = item.quantity > self.threshold && e.quantity_after <= self.threshold;
                item.quantity = e.quantity_after;

                if crossed {
                    warn!(
                        item_id = %e.item_id,
                        name = %item.name,
                        quantity = e.quantity_after,
                        threshold = self.threshold,
                        "item dropped to low stock"
                    );
                }
            }
        }

        state.cursors.insert(aggregate_id, seq);
        Ok(())
    }
}
