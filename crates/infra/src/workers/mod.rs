//! Background workers consuming the event bus.

pub mod projection_worker;
pub mod stock_watch;

pub use projection_worker::{ProjectionWorker, WorkerHandle, WorkerStats};
pub use stock_watch::StockWatchWorker;
