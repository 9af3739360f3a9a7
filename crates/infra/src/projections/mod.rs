//! Projections over published events.
//!
//! Projections are rebuildable from the event store and idempotent under
//! at-least-once delivery. They never feed back into a write decision.

pub mod low_stock;

pub use low_stock::{LowStockItem, LowStockWatch, LowStockWatchError};
