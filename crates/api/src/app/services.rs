//! Engine wiring for the HTTP layer: store, bus, shop and the stock watch.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::http::StatusCode;

use sportshub_events::InMemoryEventBus;
use sportshub_infra::command_dispatcher::DispatchError;
use sportshub_infra::event_store::{EventStore, InMemoryEventStore};
use sportshub_infra::projections::LowStockWatch;
use sportshub_infra::workers::{StockWatchWorker, WorkerHandle};
use sportshub_infra::{Envelope, Shop};

#[cfg(feature = "postgres")]
use sportshub_infra::event_store::PostgresEventStore;
#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::app::errors;
use crate::config::ApiConfig;

pub type ApiEventStore = Arc<dyn EventStore>;
pub type ApiEventBus = Arc<InMemoryEventBus<Envelope>>;
pub type ApiShop = Shop<ApiEventStore, ApiEventBus>;

pub struct AppServices {
    shop: Arc<ApiShop>,
    stock_watch: Arc<LowStockWatch>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl AppServices {
    /// In-memory services without a background worker (tests, embedding).
    pub fn in_memory(config: &ApiConfig) -> Self {
        let store: ApiEventStore = Arc::new(InMemoryEventStore::new());
        Self::assemble(store, config)
    }

    fn assemble(store: ApiEventStore, config: &ApiConfig) -> Self {
        let bus: ApiEventBus = Arc::new(InMemoryEventBus::new());
        let shop = Arc::new(Shop::new(store, bus, config.shop));
        let stock_watch = Arc::new(LowStockWatch::new(config.shop.low_stock_threshold));
        Self {
            shop,
            stock_watch,
            worker: Mutex::new(None),
        }
    }

    pub fn shop(&self) -> &Arc<ApiShop> {
        &self.shop
    }

    pub fn stock_watch(&self) -> &Arc<LowStockWatch> {
        &self.stock_watch
    }

    /// Rebuild the stock watch from the store, then keep it fed from the bus.
    pub async fn start_stock_watch(&self) -> anyhow::Result<()> {
        let shop = self.shop.clone();
        let watch = self.stock_watch.clone();
        let replayed = tokio::task::spawn_blocking(move || watch.catch_up(shop.store()))
            .await
            .context("stock watch catch-up panicked")??;
        tracing::info!(replayed, "stock watch caught up");

        let handle = StockWatchWorker::spawn(self.shop.bus(), self.stock_watch.clone())
            .context("failed to spawn stock watch worker")?;

        let mut slot = self
            .worker
            .lock()
            .map_err(|_| anyhow::anyhow!("stock watch worker slot poisoned"))?;
        if let Some(previous) = slot.replace(handle) {
            previous.shutdown();
        }
        Ok(())
    }

    pub fn shutdown(&self) {
        let handle = match self.worker.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let name = handle.name();
            let stats = handle.shutdown();
            tracing::info!(worker = name, handled = stats.handled, failed = stats.failed, "worker stopped");
        }
    }

    /// Run an engine call on the blocking pool; the engine is synchronous.
    pub async fn run<T, F>(&self, f: F) -> Result<T, axum::response::Response>
    where
        F: FnOnce(&ApiShop) -> Result<T, DispatchError> + Send + 'static,
        T: Send + 'static,
    {
        let shop = self.shop.clone();
        match tokio::task::spawn_blocking(move || f(shop.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(errors::dispatch_error_to_response(e)),
            Err(e) => {
                tracing::error!(error = %e, "engine task failed");
                Err(errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "engine task failed",
                ))
            }
        }
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    #[cfg(feature = "postgres")]
    if let Some(url) = config.database_url.as_deref() {
        let pool = PgPool::connect(url)
            .await
            .context("failed to connect to postgres")?;
        let store = PostgresEventStore::new(pool);
        store.migrate().await.context("failed to migrate event store")?;
        tracing::info!("using postgres event store");

        let services = AppServices::assemble(Arc::new(store), config);
        services.start_stock_watch().await?;
        return Ok(services);
    }

    tracing::info!("using in-memory event store");
    let services = AppServices::in_memory(config);
    services.start_stock_watch().await?;
    Ok(services)
}
