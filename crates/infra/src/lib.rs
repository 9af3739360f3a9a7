//! Infrastructure layer: event store, command pipeline and the shop engine
//! services built on them (inventory ledger, sale processor, sales reports).

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod ledger;
pub mod projections;
pub mod reporting;
pub mod sale_processor;
pub mod shop;
pub mod workers;


pub use command_dispatcher::{CommandDispatcher, DispatchError, RetryPolicy};
pub use config::ShopConfig;
pub use ledger::{EventSourcedLedger, InventoryLedger, NewItem};
pub use reporting::SalesReporter;
pub use sale_processor::SaleProcessor;
pub use shop::{Envelope, InMemoryShop, Shop};
