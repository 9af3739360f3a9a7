use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sportshub_core::AggregateId;

/// A committed event as handed to bus subscribers.
///
/// Carries two positions: `sequence_number` within its own stream (1, 2, ...
/// with no gaps) and `global_position` across every stream in commit order.
/// Events appended in one atomic batch (a sale and its item decrements) have
/// consecutive global positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    global_position: u64,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

/// Stream metadata for [`EventEnvelope::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub sequence_number: u64,
    pub global_position: u64,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
}

impl<E> EventEnvelope<E> {
    pub fn new(header: EnvelopeHeader, payload: E) -> Self {
        let EnvelopeHeader {
            event_id,
            aggregate_id,
            aggregate_type,
            sequence_number,
            global_position,
            event_type,
            occurred_at,
        } = header;
        Self {
            event_id,
            aggregate_id,
            aggregate_type,
            sequence_number,
            global_position,
            event_type,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    /// True when the event belongs to a stream of `aggregate_type`.
    pub fn is_from(&self, aggregate_type: &str) -> bool {
        self.aggregate_type == aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn global_position(&self) -> u64 {
        self.global_position
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Decode the payload, keeping the stream metadata.
    pub fn try_map_payload<T, Err>(
        self,
        f: impl FnOnce(E) -> Result<T, Err>,
    ) -> Result<EventEnvelope<T>, Err> {
        let payload = f(self.payload)?;
        Ok(EventEnvelope {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            sequence_number: self.sequence_number,
            global_position: self.global_position,
            event_type: self.event_type,
            occurred_at: self.occurred_at,
            payload,
        })
    }
}
