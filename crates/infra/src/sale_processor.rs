//! Sale transaction processor.
//!
//! A sale is one atomic append: a decrement on every referenced item stream
//! plus the new sale stream. Each item stream is expected at the version it was
//! read at, and the sale stream must not exist yet, so a concurrent sale on the
//! same items (or the same invoice) turns this attempt into a concurrency
//! conflict. The whole attempt is then re-validated against fresh state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use sportshub_core::AggregateId;
use sportshub_events::{EventBus, EventEnvelope};
use sportshub_inventory::{InventoryItem, ItemId};
use sportshub_sales::{
    demand_by_item, RecordSale, SaleCommand, SaleId, SaleLine, SaleRequest, SaleTransaction,
    SALE_AGGREGATE_TYPE,
};

use crate::command_dispatcher::{DispatchError, RetryPolicy};
use crate::event_store::EventStore;
use crate::ledger::EventSourcedLedger;

#[derive(Debug)]
pub struct SaleProcessor<S, B> {
    ledger: Arc<EventSourcedLedger<S, B>>,
    retry: RetryPolicy,
}

fn make_sale(id: AggregateId) -> SaleTransaction {
    SaleTransaction::empty(SaleId(id))
}

impl<S, B> SaleProcessor<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ledger: Arc<EventSourcedLedger<S, B>>, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    /// Validate and commit a sale at the current time.
    pub fn record_sale(&self, request: SaleRequest) -> Result<SaleTransaction, DispatchError> {
        self.record_sale_at(request, Utc::now())
    }

    /// Validate and commit a sale with an explicit commit timestamp.
    ///
    /// Validation order, first failure wins:
    /// 1. invoice number present and unused
    /// 2. payment method known
    /// 3. lines non-empty, quantity ≥ 1, price > 0
    /// 4. every item exists
    /// 5. enough stock for the summed quantity of every item
    pub fn record_sale_at(
        &self,
        request: SaleRequest,
        at: DateTime<Utc>,
    ) -> Result<SaleTransaction, DispatchError> {
        let sale = self.retry.run(|| self.attempt(&request, at))?;

        info!(
            invoice_number = sale.invoice_number(),
            payment_method = %sale.payment_method(),
            lines = sale.lines().len(),
            total = %sale.total(),
            "sale recorded"
        );
        Ok(sale)
    }

    fn attempt(
        &self,
        request: &SaleRequest,
        at: DateTime<Utc>,
    ) -> Result<SaleTransaction, DispatchError> {
        let dispatcher = self.ledger.dispatcher();

        // 1) Invoice.
        let invoice = request.invoice_number()?;
        let sale_id = SaleId::for_invoice(invoice);
        let mut sale = dispatcher.load(sale_id.0, make_sale)?;
        if sale.is_created() {
            return Err(DispatchError::DuplicateInvoice(invoice.to_string()));
        }

        // 2) Payment method. 3) Line shape.
        let payment_method = request.payment_method()?;
        let lines = request.parse_lines()?;

        // 4) Items exist, first unknown in request order wins.
        let mut items: HashMap<ItemId, InventoryItem> = HashMap::new();
        for line in &lines {
            if items.contains_key(&line.item_id) {
                continue;
            }
            let item = self
                .ledger
                .load_for_sale(line.item_id)?
                .ok_or_else(|| DispatchError::NotFound(format!("item {}", line.item_id)))?;
            items.insert(line.item_id, item);
        }

        // 5) Stock, checked against the summed demand per item.
        let demand = demand_by_item(&lines)?;
        for id in first_seen_order(&lines) {
            let requested = demand.get(&id).copied().unwrap_or(0);
            let available = items.get(&id).map(InventoryItem::quantity).unwrap_or(0);
            if requested > available {
                return Err(DispatchError::InsufficientStock {
                    item_id: id.0,
                    requested,
                    available,
                });
            }
        }

        // Stage every item decrement in item-id order, then the sale itself.
        let mut batch = Vec::with_capacity(demand.len() + 1);
        for (id, quantity) in &demand {
            let item = items
                .get_mut(id)
                .ok_or_else(|| DispatchError::NotFound(format!("item {id}")))?;
            if let Some(append) = self.ledger.stage_sale_decrement(item, *quantity, invoice, at)? {
                batch.push(append);
            }
        }

        let cmd = SaleCommand::RecordSale(RecordSale {
            sale_id,
            invoice_number: invoice.to_string(),
            payment_method,
            lines,
            occurred_at: at,
        });
        if let Some(append) = dispatcher.stage(sale_id.0, SALE_AGGREGATE_TYPE, &mut sale, &cmd)? {
            batch.push(append);
        }

        dispatcher.commit(batch)?;
        Ok(sale)
    }
}

fn first_seen_order(lines: &[SaleLine]) -> Vec<ItemId> {
    let mut order: Vec<ItemId> = Vec::with_capacity(lines.len());
    for line in lines {
        if !order.contains(&line.item_id) {
            order.push(line.item_id);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use sportshub_core::Money;
    use sportshub_events::InMemoryEventBus;
    use sportshub_inventory::Category;
    use sportshub_sales::{PaymentMethod, SaleLineRequest};

    use crate::command_dispatcher::CommandDispatcher;
    use crate::event_store::InMemoryEventStore;
    use crate::ledger::{InventoryLedger, NewItem};

    type Engine = (
        Arc<EventSourcedLedger<Arc<InMemoryEventStore>, InMemoryEventBus<EventEnvelope<JsonValue>>>>,
        SaleProcessor<Arc<InMemoryEventStore>, InMemoryEventBus<EventEnvelope<JsonValue>>>,
    );

    fn engine() -> Engine {
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::new(InMemoryEventStore::new()),
            InMemoryEventBus::new(),
        ));
        let ledger = Arc::new(EventSourcedLedger::new(dispatcher, RetryPolicy::default()));
        let processor = SaleProcessor::new(ledger.clone(), RetryPolicy::default());
        (ledger, processor)
    }

    fn stock(ledger: &impl InventoryLedger, name: &str, quantity: i64) -> ItemId {
        ledger
            .add_item(NewItem {
                name: name.to_string(),
                category: Category::Balls,
                quantity,
                unit_price: Money::from(1500),
            })
            .unwrap()
            .id_typed()
    }

    fn line(item: ItemId, quantity: i64, unit_price: i64) -> SaleLineRequest {
        SaleLineRequest {
            item_id: item.to_string(),
            quantity,
            unit_price: Money::from(unit_price),
        }
    }

    fn request(invoice: &str, method: &str, lines: Vec<SaleLineRequest>) -> SaleRequest {
        SaleRequest {
            invoice_number: invoice.to_string(),
            payment_method: method.to_string(),
            lines,
        }
    }

    #[test]
    fn sale_decrements_stock_and_records_the_transaction() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 15);

        let sale = processor
            .record_sale(request("INV-1", "Cash", vec![line(ball, 3, 1500)]))
            .unwrap();

        assert_eq!(sale.invoice_number(), "INV-1");
        assert_eq!(sale.payment_method(), PaymentMethod::Cash);
        assert_eq!(sale.total(), Money::from(4500));
        assert_eq!(ledger.get_item(ball).unwrap().quantity(), 12);
    }

    #[test]
    fn reused_invoice_is_reported_before_anything_else() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 15);
        processor
            .record_sale(request("INV-1", "Cash", vec![line(ball, 1, 1500)]))
            .unwrap();

        // Invalid payment method and lines, but the invoice check comes first.
        let err = processor
            .record_sale(request(" INV-1 ", "Cheque", vec![]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateInvoice(ref inv) if inv == "INV-1"));
        assert_eq!(ledger.get_item(ball).unwrap().quantity(), 14);
    }

    #[test]
    fn validation_order_is_payment_then_lines_then_items_then_stock() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 1);
        let ghost = ItemId::generate();

        let err = processor
            .record_sale(request("INV-2", "Cheque", vec![line(ball, 0, 1)]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(ref m) if m.contains("payment")));

        let err = processor
            .record_sale(request("INV-2", "Card", vec![line(ghost, 5, 1), line(ball, 0, 1)]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(ref m) if m.starts_with("line 2")));

        let err = processor
            .record_sale(request("INV-2", "Card", vec![line(ball, 5, 1), line(ghost, 1, 1)]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));

        let err = processor
            .record_sale(request("INV-2", "Card", vec![line(ball, 5, 1)]))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InsufficientStock { requested: 5, available: 1, .. }
        ));
    }

    #[test]
    fn blank_invoice_is_a_validation_error() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 1);
        let err = processor
            .record_sale(request("  ", "Cash", vec![line(ball, 1, 1)]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[test]
    fn repeated_item_lines_are_checked_against_their_sum() {
        let (ledger, processor) = engine();
        let boots = stock(&ledger, "Boots", 5);

        let err = processor
            .record_sale(request("INV-3", "Card", vec![line(boots, 3, 10), line(boots, 3, 10)]))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InsufficientStock { requested: 6, available: 5, .. }
        ));
        assert_eq!(ledger.get_item(boots).unwrap().quantity(), 5);

        processor
            .record_sale(request("INV-3", "Card", vec![line(boots, 3, 10), line(boots, 2, 10)]))
            .unwrap();
        assert_eq!(ledger.get_item(boots).unwrap().quantity(), 0);
    }

    #[test]
    fn a_short_line_rolls_back_the_whole_sale() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 10);
        let socks = stock(&ledger, "Socks", 1);

        let err = processor
            .record_sale(request("INV-4", "M-Pesa", vec![line(ball, 2, 10), line(socks, 2, 5)]))
            .unwrap_err();

        assert!(matches!(err, DispatchError::InsufficientStock { available: 1, .. }));
        assert_eq!(ledger.get_item(ball).unwrap().quantity(), 10);
        assert_eq!(ledger.get_item(socks).unwrap().quantity(), 1);

        // The invoice is still free.
        let sale = processor
            .record_sale(request("INV-4", "M-Pesa", vec![line(ball, 2, 10)]))
            .unwrap();
        assert_eq!(sale.payment_method(), PaymentMethod::MobileMoney);
    }

    #[test]
    fn sale_prices_are_snapshots() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 10);

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let sale = processor
            .record_sale_at(request("INV-5", "Cash", vec![line(ball, 1, 1200)]), at)
            .unwrap();

        assert_eq!(sale.recorded_at(), at);
        assert_eq!(sale.lines()[0].unit_price, Money::from(1200));
        assert_eq!(ledger.get_item(ball).unwrap().unit_price(), Money::from(1500));
    }

    #[test]
    fn repeated_lines_overflowing_demand_change_nothing() {
        let (ledger, processor) = engine();
        let ball = stock(&ledger, "Football", 5);

        let err = processor
            .record_sale(request(
                "INV-MAX",
                "Cash",
                vec![line(ball, i64::MAX, 1), line(ball, i64::MAX, 1)],
            ))
            .unwrap_err();

        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(ledger.get_item(ball).unwrap().quantity(), 5);
        // The invoice was never used.
        processor
            .record_sale(request("INV-MAX", "Cash", vec![line(ball, 1, 1)]))
            .unwrap();
        assert_eq!(ledger.get_item(ball).unwrap().quantity(), 4);
    }

    #[test]
    fn line_total_beyond_decimal_range_is_a_validation_error() {
        let (ledger, processor) = engine();
        let price: Money = serde_json::from_str("\"100000000000000000000\"").unwrap();
        let crate_of_balls = ledger
            .add_item(NewItem {
                name: "Bulk balls".to_string(),
                category: Category::Balls,
                quantity: 1_000_000_000,
                unit_price: price,
            })
            .unwrap()
            .id_typed();

        let err = processor
            .record_sale(request(
                "INV-HUGE",
                "Card",
                vec![SaleLineRequest {
                    item_id: crate_of_balls.to_string(),
                    quantity: 1_000_000_000,
                    unit_price: price,
                }],
            ))
            .unwrap_err();

        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(
            ledger.get_item(crate_of_balls).unwrap().quantity(),
            1_000_000_000
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a sale either takes exactly the requested units from every
        /// item or changes nothing at all.
        #[test]
        fn sale_is_all_or_nothing(
            stocks in prop::collection::vec(0i64..20, 1..4),
            wanted in prop::collection::vec((0usize..4, 1i64..10), 1..6)
        ) {
            let (ledger, processor) = engine();
            let ids: Vec<ItemId> = stocks
                .iter()
                .enumerate()
                .map(|(i, q)| stock(&ledger, &format!("item-{i}"), *q))
                .collect();

            let lines: Vec<SaleLineRequest> = wanted
                .iter()
                .map(|(idx, q)| line(ids[idx % ids.len()], *q, 100))
                .collect();

            let mut demand = vec![0i64; ids.len()];
            for (idx, q) in &wanted {
                demand[idx % ids.len()] += q;
            }
            let fits = demand.iter().zip(&stocks).all(|(d, s)| d <= s);

            let result = processor.record_sale(request("INV-P", "Cash", lines));
            prop_assert_eq!(result.is_ok(), fits);
            if !fits {
                let is_insufficient = matches!(result, Err(DispatchError::InsufficientStock { .. }));
                prop_assert!(is_insufficient);
            }

            for (i, id) in ids.iter().enumerate() {
                let expected = if fits { stocks[i] - demand[i] } else { stocks[i] };
                prop_assert_eq!(ledger.get_item(*id).unwrap().quantity(), expected);
            }
        }
    }
}
