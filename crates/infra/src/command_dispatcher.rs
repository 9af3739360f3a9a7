//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Append to store (optimistic concurrency, one or many streams atomically)
//!   ↓
//! 5. Publish committed events to the bus (best-effort)
//! ```
//!
//! Single-aggregate commands go through `dispatch`. Work that must change
//! several streams at once (a sale decrementing many items) uses the lower
//! level `load` / `stage` / `commit` steps so every stream lands in one
//! `append_atomic` call.
//!
//! This module contains no IO itself; it composes infrastructure traits.

use std::thread;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use sportshub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion};
use sportshub_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

/// Caller-facing failure of an engine operation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate invoice number: {0}")]
    DuplicateInvoice(String),

    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: AggregateId,
        requested: i64,
        available: i64,
    },

    /// Concurrent writers kept winning and the retry budget ran out.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stream moved between load and append. Retried by `RetryPolicy`.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A stored payload no longer decodes into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::NotFound(msg) => DispatchError::NotFound(msg),
            DomainError::DuplicateInvoice(invoice) => DispatchError::DuplicateInvoice(invoice),
            DomainError::InsufficientStock {
                item_id,
                requested,
                available,
            } => DispatchError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
        }
    }
}

/// Bounded retry for optimistic concurrency conflicts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run `op` until it stops failing with `Concurrency`.
    ///
    /// Every attempt must reload state from the store. When the budget is
    /// spent the last conflict is surfaced as `Conflict`.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, DispatchError>,
    ) -> Result<T, DispatchError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op() {
                Err(DispatchError::Concurrency(msg)) if attempt < max_attempts => {
                    debug!(attempt, max_attempts, reason = %msg, "retrying after concurrency conflict");
                    thread::yield_now();
                }
                Err(DispatchError::Concurrency(msg)) => {
                    return Err(DispatchError::Conflict(format!(
                        "gave up after {attempt} attempts: {msg}"
                    )));
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// - Events are persisted before publication; if append fails nothing is published.
/// - Publication is best-effort: a bus failure is logged and the committed
///   result is still returned. Consumers can always rebuild from the store.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Load and rehydrate one aggregate.
    ///
    /// An unknown stream yields the fresh aggregate from `make_aggregate`
    /// (version 0).
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        for stored in &history {
            aggregate.apply(&decode::<A::Event>(stored)?);
        }

        Ok(aggregate)
    }

    /// Decide events for an already-loaded aggregate without writing them.
    ///
    /// The aggregate is advanced to its would-be state and the returned
    /// `StreamAppend` expects the version it had before. `None` when the
    /// command produced no events.
    pub fn stage<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        aggregate: &mut A,
        command: &A::Command,
    ) -> Result<Option<StreamAppend>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: sportshub_events::Event + Serialize,
    {
        let expected = ExpectedVersion::for_version(aggregate.version());

        let decided = aggregate.handle(command)?;
        if decided.is_empty() {
            return Ok(None);
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        Ok(Some(StreamAppend::new(
            aggregate_id,
            aggregate_type,
            expected,
            uncommitted,
        )))
    }

    /// Append staged streams as one unit, then publish.
    pub fn commit(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, DispatchError> {
        let committed = self.store.append_atomic(batch)?;
        self.publish(&committed);
        Ok(committed)
    }

    /// Full pipeline for a single aggregate. Returns the aggregate after the command.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: sportshub_events::Event + Serialize + DeserializeOwned,
    {
        let mut aggregate = self.load(aggregate_id, make_aggregate)?;
        if let Some(append) = self.stage(aggregate_id, aggregate_type, &mut aggregate, command)? {
            self.commit(vec![append])?;
        }
        Ok(aggregate)
    }

    /// `dispatch`, re-run from a fresh load on concurrency conflicts.
    pub fn dispatch_with_retry<A>(
        &self,
        policy: &RetryPolicy,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: sportshub_events::Event + Serialize + DeserializeOwned,
    {
        policy.run(|| self.dispatch(aggregate_id, aggregate_type, command, &make_aggregate))
    }

    /// Every event of one aggregate type, decoded, in global commit order.
    pub fn load_all<E>(&self, aggregate_type: &str) -> Result<Vec<(AggregateId, E)>, DispatchError>
    where
        E: DeserializeOwned,
    {
        self.store
            .load_all(aggregate_type)?
            .iter()
            .map(|stored| Ok((stored.aggregate_id, decode::<E>(stored)?)))
            .collect()
    }

    fn publish(&self, committed: &[StoredEvent]) {
        for stored in committed {
            if let Err(err) = self.bus.publish(stored.to_envelope()) {
                warn!(
                    event_id = %stored.event_id,
                    event_type = %stored.event_type,
                    error = ?err,
                    "event committed but publication failed"
                );
            }
        }
    }
}

/// Decode a stored payload into a typed event.
pub fn decode<E: DeserializeOwned>(stored: &StoredEvent) -> Result<E, DispatchError> {
    serde_json::from_value(stored.payload.clone()).map_err(|e| {
        DispatchError::Deserialize(format!(
            "{} #{} ({}): {e}",
            stored.aggregate_id, stored.sequence_number, stored.event_type
        ))
    })
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // A backend bug must not leak foreign events into a rehydration.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::Backend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number != last + 1 {
            return Err(DispatchError::Store(EventStoreError::Backend(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::{mpsc, Arc};

    use chrono::Utc;
    use sportshub_core::Money;
    use sportshub_events::{InMemoryEventBus, Subscription};
    use sportshub_inventory::{
        AddItem, AdjustQuantity, AdjustmentReason, Category, InventoryCommand, InventoryItem,
        ItemId, ITEM_AGGREGATE_TYPE,
    };

    use crate::event_store::InMemoryEventStore;

    type Envelope = EventEnvelope<JsonValue>;

    struct FailingBus;

    impl EventBus<Envelope> for FailingBus {
        type Error = &'static str;

        fn publish(&self, _message: Envelope) -> Result<(), Self::Error> {
            Err("bus unavailable")
        }

        fn subscribe(&self) -> Subscription<Envelope> {
            Subscription::new(mpsc::channel().1)
        }
    }

    fn add(item_id: ItemId, quantity: i64) -> InventoryCommand {
        InventoryCommand::AddItem(AddItem {
            item_id,
            name: "Jersey".to_string(),
            category: Category::Jerseys,
            quantity,
            unit_price: Money::from(2500),
            occurred_at: Utc::now(),
        })
    }

    fn adjust(item_id: ItemId, delta: i64) -> InventoryCommand {
        InventoryCommand::AdjustQuantity(AdjustQuantity {
            item_id,
            delta,
            reason: AdjustmentReason::Manual,
            occurred_at: Utc::now(),
        })
    }

    fn make(id: AggregateId) -> InventoryItem {
        InventoryItem::empty(ItemId::new(id))
    }

    #[test]
    fn dispatch_persists_publishes_and_returns_new_state() {
        let store = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(InMemoryEventBus::<Envelope>::new());
        let sub = bus.subscribe();
        let dispatcher = CommandDispatcher::new(store.clone(), bus);

        let item_id = ItemId::generate();
        let item = dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &add(item_id, 5), make)
            .unwrap();
        assert_eq!(item.quantity(), 5);

        let item = dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &adjust(item_id, 3), make)
            .unwrap();
        assert_eq!(item.quantity(), 8);
        assert_eq!(item.version(), 2);

        assert_eq!(store.load_stream(item_id.0).unwrap().len(), 2);
        assert_eq!(sub.try_recv().unwrap().sequence_number(), 1);
        assert_eq!(sub.try_recv().unwrap().event_type(), "inventory.item.quantity_adjusted");
    }

    #[test]
    fn domain_errors_write_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let dispatcher = CommandDispatcher::new(store.clone(), InMemoryEventBus::<Envelope>::new());

        let item_id = ItemId::generate();
        let err = dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &adjust(item_id, 1), make)
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotFound(_)));
        assert!(store.load_stream(item_id.0).unwrap().is_empty());
    }

    #[test]
    fn publish_failure_does_not_fail_the_command() {
        let store = Arc::new(InMemoryEventStore::new());
        let dispatcher = CommandDispatcher::new(store.clone(), FailingBus);

        let item_id = ItemId::generate();
        let item = dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &add(item_id, 1), make)
            .unwrap();

        assert!(item.is_created());
        assert_eq!(store.load_stream(item_id.0).unwrap().len(), 1);
    }

    #[test]
    fn stale_stage_is_rejected_on_commit() {
        let store = Arc::new(InMemoryEventStore::new());
        let dispatcher = CommandDispatcher::new(store, InMemoryEventBus::<Envelope>::new());

        let item_id = ItemId::generate();
        dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &add(item_id, 10), make)
            .unwrap();

        let mut stale = dispatcher.load(item_id.0, make).unwrap();
        dispatcher
            .dispatch(item_id.0, ITEM_AGGREGATE_TYPE, &adjust(item_id, -1), make)
            .unwrap();

        let append = dispatcher
            .stage(item_id.0, ITEM_AGGREGATE_TYPE, &mut stale, &adjust(item_id, -1))
            .unwrap()
            .unwrap();
        let err = dispatcher.commit(vec![append]).unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }

    #[test]
    fn retry_policy_gives_up_with_conflict() {
        let calls = Cell::new(0);
        let result: Result<(), _> = RetryPolicy::new(3).run(|| {
            calls.set(calls.get() + 1);
            Err(DispatchError::Concurrency("stream moved".to_string()))
        });

        assert_eq!(calls.get(), 3);
        assert!(matches!(result, Err(DispatchError::Conflict(_))));
    }

    #[test]
    fn retry_policy_recovers_from_transient_conflicts() {
        let calls = Cell::new(0);
        let result = RetryPolicy::default().run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(DispatchError::Concurrency("stream moved".to_string()))
            } else {
                Ok(calls.get())
            }
        });

        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn retry_policy_does_not_retry_business_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = RetryPolicy::default().run(|| {
            calls.set(calls.get() + 1);
            Err(DispatchError::Validation("bad".to_string()))
        });

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }
}
