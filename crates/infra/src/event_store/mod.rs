//! Append-only event store boundary.
//!
//! Items and sale transactions are persisted as event streams. The store knows
//! nothing about either domain: it checks stream versions, assigns sequence
//! numbers and global positions, and hands back what was committed.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
