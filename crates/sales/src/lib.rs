//! Sales domain module (event-sourced).
//!
//! Sale transactions, payment methods and report bucketing, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Stock decrements
//! for a sale are applied to the item aggregates by the infra layer in the same
//! atomic commit as the `SaleRecorded` event.

pub mod payment;
pub mod report;
pub mod transaction;

pub use payment::PaymentMethod;
pub use report::{aggregate, ReportBucket, ReportPeriod};
pub use transaction::{
    demand_by_item, sale_total, RecordSale, SaleCommand, SaleEvent, SaleId, SaleLine, SaleLineRequest,
    SaleRecorded, SaleRequest, SaleTransaction, SALE_AGGREGATE_TYPE,
};
