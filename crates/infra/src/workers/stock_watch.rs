use std::io;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use sportshub_events::{EventBus, EventEnvelope};

use crate::projections::LowStockWatch;
use crate::workers::projection_worker::{ProjectionWorker, WorkerHandle};

pub const STOCK_WATCH_WORKER: &str = "sportshub-stock-watch";

/// Background thread feeding published inventory events into a `LowStockWatch`.
#[derive(Debug)]
pub struct StockWatchWorker;

impl StockWatchWorker {
    pub fn spawn<B>(bus: &B, watch: Arc<LowStockWatch>) -> io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<JsonValue>> + ?Sized,
    {
        ProjectionWorker::spawn(STOCK_WATCH_WORKER, bus, move |envelope: EventEnvelope<JsonValue>| {
            watch.apply_envelope(&envelope)
        })
    }
}
