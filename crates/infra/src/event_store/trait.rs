use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use sportshub_core::{AggregateId, ExpectedVersion};

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Lifecycle:
///
/// 1. **Domain event**: produced by an aggregate's `handle()`
/// 2. **UncommittedEvent**: serialized payload + stream metadata
/// 3. **StoredEvent**: persisted with `sequence_number` and `global_position`
/// 4. **EventEnvelope**: published to the bus for background consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Build from a typed domain event, capturing the metadata needed to decode it later.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: sportshub_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.schema_version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// A persisted event.
///
/// - `sequence_number` is per stream, starting at 1 with no gaps.
/// - `global_position` orders events across all streams in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub sequence_number: u64,
    pub global_position: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Envelope for publication on the bus.
    pub fn to_envelope(&self) -> sportshub_events::EventEnvelope<JsonValue> {
        sportshub_events::EventEnvelope::new(
            sportshub_events::EnvelopeHeader {
                event_id: self.event_id,
                aggregate_id: self.aggregate_id,
                aggregate_type: self.aggregate_type.clone(),
                sequence_number: self.sequence_number,
                global_position: self.global_position,
                event_type: self.event_type.clone(),
                occurred_at: self.occurred_at,
            },
            self.payload.clone(),
        )
    }
}

/// Events for one stream inside an atomic batch, with that stream's own
/// concurrency expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAppend {
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub expected_version: ExpectedVersion,
    pub events: Vec<UncommittedEvent>,
}

impl StreamAppend {
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        expected_version: ExpectedVersion,
        events: Vec<UncommittedEvent>,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            expected_version,
            events,
        }
    }
}

/// Event store operation error (infrastructure, not business rules).
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A stream was not at the expected version. Safe to retry from a fresh load.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Storage backend failure (connection, poisoned lock, malformed row).
    #[error("event store backend failure: {0}")]
    Backend(String),
}

/// Append-only event store.
///
/// Streams are keyed by `aggregate_id`; every stream holds exactly one
/// aggregate type. `append_atomic` is the only write primitive that spans
/// streams: every stream's version check and every insert succeed together
/// or nothing is written.
pub trait EventStore: Send + Sync {
    /// Append to several streams as one unit.
    ///
    /// Returns the committed events in the order they were given.
    fn append_atomic(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load one stream in sequence order. Unknown streams are empty.
    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every event of one aggregate type, in global commit order.
    fn load_all(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Append to a single stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        let append = StreamAppend::new(
            first.aggregate_id,
            first.aggregate_type.clone(),
            expected_version,
            events,
        );
        self.append_atomic(vec![append])
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append_atomic(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append_atomic(batch)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }

    fn load_all(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all(aggregate_type)
    }

    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }
}

/// Shape checks shared by every backend, run before touching storage.
///
/// - each stream appears at most once
/// - each stream entry carries at least one event
/// - every event matches its entry's aggregate id and type
pub(crate) fn validate_batch(batch: &[StreamAppend]) -> Result<(), EventStoreError> {
    let mut seen = HashSet::with_capacity(batch.len());

    for (idx, append) in batch.iter().enumerate() {
        if !seen.insert(append.aggregate_id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {} appears more than once in batch (index {idx})",
                append.aggregate_id
            )));
        }
        if append.events.is_empty() {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {} has no events (index {idx})",
                append.aggregate_id
            )));
        }
        for e in &append.events {
            if e.aggregate_id != append.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event {} targets {} inside the batch for {}",
                    e.event_id, e.aggregate_id, append.aggregate_id
                )));
            }
            if e.aggregate_type != append.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "event type '{}' inside batch for '{}'",
                    e.aggregate_type, append.aggregate_type
                )));
            }
        }
    }

    Ok(())
}
