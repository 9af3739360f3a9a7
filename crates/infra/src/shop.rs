//! Engine facade wiring the ledger, sale processor and reporter over one store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use sportshub_events::{EventBus, EventEnvelope, InMemoryEventBus};
use sportshub_inventory::{InventoryItem, ItemId};
use sportshub_sales::{ReportBucket, ReportPeriod, SaleRequest, SaleTransaction};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::ShopConfig;
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::ledger::{EventSourcedLedger, InventoryLedger, NewItem};
use crate::reporting::SalesReporter;
use crate::sale_processor::SaleProcessor;

/// Bus message type: committed events with JSON payloads.
pub type Envelope = EventEnvelope<JsonValue>;

/// Single-process shop: in-memory store and bus.
pub type InMemoryShop = Shop<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<Envelope>>>;

#[derive(Debug)]
pub struct Shop<S, B> {
    config: ShopConfig,
    ledger: Arc<EventSourcedLedger<S, B>>,
    sales: SaleProcessor<S, B>,
    reports: SalesReporter<S>,
}

impl<S, B> Shop<S, B>
where
    S: EventStore + Clone,
    B: EventBus<Envelope>,
{
    pub fn new(store: S, bus: B, config: ShopConfig) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(store.clone(), bus));
        let ledger = Arc::new(EventSourcedLedger::new(dispatcher, config.retry));

        Self {
            config,
            sales: SaleProcessor::new(ledger.clone(), config.retry),
            reports: SalesReporter::new(store),
            ledger,
        }
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.ledger.dispatcher().store()
    }

    pub fn bus(&self) -> &B {
        self.ledger.dispatcher().bus()
    }

    pub fn add_item(&self, item: NewItem) -> Result<InventoryItem, DispatchError> {
        self.ledger.add_item(item)
    }

    pub fn get_item(&self, id: ItemId) -> Result<InventoryItem, DispatchError> {
        self.ledger.get_item(id)
    }

    pub fn list_items(&self) -> Result<Vec<InventoryItem>, DispatchError> {
        self.ledger.list_items()
    }

    pub fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<InventoryItem, DispatchError> {
        self.ledger.adjust_quantity(id, delta)
    }

    /// Items at or below the configured threshold, in insertion order.
    pub fn low_stock_items(&self) -> Result<Vec<InventoryItem>, DispatchError> {
        let threshold = self.config.low_stock_threshold;
        Ok(self
            .ledger
            .list_items()?
            .into_iter()
            .filter(|item| item.is_low_stock(threshold))
            .collect())
    }

    pub fn is_low_stock(&self, item: &InventoryItem) -> bool {
        item.is_low_stock(self.config.low_stock_threshold)
    }

    pub fn record_sale(&self, request: SaleRequest) -> Result<SaleTransaction, DispatchError> {
        self.sales.record_sale(request)
    }

    pub fn record_sale_at(
        &self,
        request: SaleRequest,
        at: DateTime<Utc>,
    ) -> Result<SaleTransaction, DispatchError> {
        self.sales.record_sale_at(request, at)
    }

    pub fn list_sales(&self) -> Result<Vec<SaleTransaction>, DispatchError> {
        self.reports.list_sales()
    }

    pub fn sales_report(&self, period: ReportPeriod) -> Result<Vec<ReportBucket>, DispatchError> {
        self.reports.aggregate(period)
    }
}

impl InMemoryShop {
    pub fn in_memory(config: ShopConfig) -> Self {
        Self::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryEventBus::new()),
            config,
        )
    }
}
