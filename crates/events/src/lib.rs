//! Domain events and their distribution.
//!
//! Events are the source of truth for the ledger: item quantities and sale
//! transactions are rebuilt by replaying them. After a commit, events are
//! published on an [`EventBus`] for background consumers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{EnvelopeHeader, EventEnvelope};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
