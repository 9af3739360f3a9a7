//! Postgres-backed event store implementation.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | EventStoreError |
//! |------------|-----------------|-----------------|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (check violation) | `23514` | `InvalidAppend` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / IO / other | N/A | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresEventStore` is `Send + Sync`. The synchronous `EventStore` methods
//! drive the async queries with `Handle::block_on`, so they must be called from
//! a blocking context inside a tokio runtime (e.g. `spawn_blocking`), never from
//! an async task directly.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::{instrument, Span};

use sportshub_core::AggregateId;

use super::r#trait::{validate_batch, EventStore, EventStoreError, StoredEvent, StreamAppend};

/// Postgres-backed append-only event store.
///
/// One `events` table; `UNIQUE (aggregate_id, sequence_number)` backs up the
/// version check, so two transactions that both pass the check cannot both
/// insert the same sequence number. `global_position` is a `BIGSERIAL`.
///
/// `append_atomic` checks and inserts every stream of a batch inside one SQL
/// transaction.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                global_position BIGSERIAL PRIMARY KEY,
                event_id UUID NOT NULL UNIQUE,
                aggregate_id UUID NOT NULL,
                aggregate_type TEXT NOT NULL,
                sequence_number BIGINT NOT NULL CHECK (sequence_number > 0),
                event_type TEXT NOT NULL,
                event_version INTEGER NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (aggregate_id, sequence_number)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_events_table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS events_by_type ON events (aggregate_type, global_position)",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_events_index", e))?;

        Ok(())
    }

    /// Load all events for one stream in sequence order.
    #[instrument(
        skip(self),
        fields(aggregate_id = %aggregate_id, event_count = tracing::field::Empty),
        err
    )]
    pub async fn load_stream_async(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, aggregate_id, aggregate_type, sequence_number, global_position,
                   event_type, event_version, occurred_at, payload
            FROM events
            WHERE aggregate_id = $1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stream", e))?;

        let events = rows
            .iter()
            .map(stored_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("event_count", events.len());
        Ok(events)
    }

    /// Load every event of one aggregate type in global order.
    #[instrument(skip(self), fields(event_count = tracing::field::Empty), err)]
    pub async fn load_all_async(
        &self,
        aggregate_type: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, aggregate_id, aggregate_type, sequence_number, global_position,
                   event_type, event_version, occurred_at, payload
            FROM events
            WHERE aggregate_type = $1
            ORDER BY global_position ASC
            "#,
        )
        .bind(aggregate_type)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_all", e))?;

        let events = rows
            .iter()
            .map(stored_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("event_count", events.len());
        Ok(events)
    }

    /// Append to several streams in one transaction.
    #[instrument(
        skip(self, batch),
        fields(streams = batch.len(), committed_events = tracing::field::Empty),
        err
    )]
    pub async fn append_atomic_async(
        &self,
        batch: Vec<StreamAppend>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if batch.is_empty() {
            return Ok(vec![]);
        }
        validate_batch(&batch)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Dropping `tx` without commit rolls back.
        for append in &batch {
            let (current, existing_type) = check_stream_version(&mut tx, append.aggregate_id).await?;

            if let Some(existing_type) = existing_type {
                if existing_type != append.aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{existing_type}', attempted append with '{}'",
                        append.aggregate_type
                    )));
                }
            }

            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {}: expected {:?}, found {current}",
                    append.aggregate_id, append.expected_version
                )));
            }
        }

        let mut committed = Vec::new();
        for append in batch {
            let (current, _) = check_stream_version(&mut tx, append.aggregate_id).await?;
            let mut next_sequence = current + 1;

            for event in append.events {
                let row = sqlx::query(
                    r#"
                    INSERT INTO events (
                        event_id, aggregate_id, aggregate_type, sequence_number,
                        event_type, event_version, occurred_at, payload
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING global_position
                    "#,
                )
                .bind(event.event_id)
                .bind(event.aggregate_id.as_uuid())
                .bind(&event.aggregate_type)
                .bind(next_sequence as i64)
                .bind(&event.event_type)
                .bind(event.event_version as i32)
                .bind(event.occurred_at)
                .bind(&event.payload)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        EventStoreError::Concurrency(format!(
                            "concurrent append detected: stream {} sequence {next_sequence} already exists",
                            event.aggregate_id
                        ))
                    } else {
                        map_sqlx_error("insert_event", e)
                    }
                })?;

                let global_position: i64 = row
                    .try_get("global_position")
                    .map_err(|e| EventStoreError::Backend(format!("failed to read global_position: {e}")))?;

                committed.push(StoredEvent {
                    event_id: event.event_id,
                    aggregate_id: event.aggregate_id,
                    aggregate_type: event.aggregate_type,
                    sequence_number: next_sequence,
                    global_position: global_position as u64,
                    event_type: event.event_type,
                    event_version: event.event_version,
                    occurred_at: event.occurred_at,
                    payload: event.payload,
                });
                next_sequence += 1;
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("committed_events", committed.len());
        Ok(committed)
    }
}

/// Current version and aggregate type of a stream (`0` / `None` when empty).
async fn check_stream_version(
    tx: &mut Transaction<'_, Postgres>,
    aggregate_id: AggregateId,
) -> Result<(u64, Option<String>), EventStoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(MAX(sequence_number), 0) AS current_version,
            MAX(aggregate_type) AS aggregate_type
        FROM events
        WHERE aggregate_id = $1
        "#,
    )
    .bind(aggregate_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("check_stream_version", e))?;

    let current_version: Option<i64> = row
        .try_get("current_version")
        .map_err(|e| EventStoreError::Backend(format!("failed to read current_version: {e}")))?;
    let aggregate_type: Option<String> = row
        .try_get("aggregate_type")
        .map_err(|e| EventStoreError::Backend(format!("failed to read aggregate_type: {e}")))?;

    Ok((current_version.unwrap_or(0) as u64, aggregate_type))
}

fn stored_event_from_row(row: &sqlx::postgres::PgRow) -> Result<StoredEvent, EventStoreError> {
    let decode = |e: sqlx::Error| EventStoreError::Backend(format!("failed to decode event row: {e}"));

    let aggregate_id: uuid::Uuid = row.try_get("aggregate_id").map_err(decode)?;
    let sequence_number: i64 = row.try_get("sequence_number").map_err(decode)?;
    let global_position: i64 = row.try_get("global_position").map_err(decode)?;
    let event_version: i32 = row.try_get("event_version").map_err(decode)?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(decode)?;

    Ok(StoredEvent {
        event_id: row.try_get("event_id").map_err(decode)?,
        aggregate_id: AggregateId::from_uuid(aggregate_id),
        aggregate_type: row.try_get("aggregate_type").map_err(decode)?,
        sequence_number: sequence_number as u64,
        global_position: global_position as u64,
        event_type: row.try_get("event_type").map_err(decode)?,
        event_version: event_version as u32,
        occurred_at,
        payload: row.try_get("payload").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => EventStoreError::Concurrency(msg),
                Some("23514") => EventStoreError::InvalidAppend(msg),
                _ => EventStoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => EventStoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, EventStoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        EventStoreError::Backend(
            "PostgresEventStore requires a tokio runtime; call it from spawn_blocking".to_string(),
        )
    })
}

impl EventStore for PostgresEventStore {
    fn append_atomic(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.append_atomic_async(batch))
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.load_stream_async(aggregate_id))
    }

    fn load_all(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.load_all_async(aggregate_type))
    }
}
