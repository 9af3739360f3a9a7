//! Sales report aggregator over the committed sale streams. Read-only.

use sportshub_sales::{aggregate, ReportBucket, ReportPeriod, SaleEvent, SaleTransaction, SALE_AGGREGATE_TYPE};

use crate::command_dispatcher::{decode, DispatchError};
use crate::event_store::EventStore;

#[derive(Debug, Clone)]
pub struct SalesReporter<S> {
    store: S,
}

impl<S> SalesReporter<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every committed sale, in commit order.
    pub fn list_sales(&self) -> Result<Vec<SaleTransaction>, DispatchError> {
        self.store
            .load_all(SALE_AGGREGATE_TYPE)?
            .iter()
            .map(|stored| {
                let event = decode::<SaleEvent>(stored)?;
                Ok(match &event {
                    SaleEvent::SaleRecorded(recorded) => SaleTransaction::from_recorded(recorded),
                })
            })
            .collect()
    }

    /// Period totals, chronological and sparse. An empty log gives an empty report.
    pub fn aggregate(&self, period: ReportPeriod) -> Result<Vec<ReportBucket>, DispatchError> {
        let sales = self.list_sales()?;
        tracing::debug!(period = %period, sales = sales.len(), "aggregating sales report");
        Ok(aggregate(period, &sales)?)
    }
}
