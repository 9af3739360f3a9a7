//! Inventory ledger service: the only writer of item quantities.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use sportshub_core::{Aggregate, AggregateId, Money};
use sportshub_events::{EventBus, EventEnvelope};
use sportshub_inventory::{
    AddItem, AdjustQuantity, AdjustmentReason, Category, InventoryCommand, InventoryEvent,
    InventoryItem, ItemId, ITEM_AGGREGATE_TYPE,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError, RetryPolicy};
use crate::event_store::{EventStore, StreamAppend};

/// Input for `add_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Authoritative store of item quantities.
///
/// Every successful mutation is visible to the next read; there is no cache.
pub trait InventoryLedger: Send + Sync {
    fn add_item(&self, item: NewItem) -> Result<InventoryItem, DispatchError>;

    fn get_item(&self, id: ItemId) -> Result<InventoryItem, DispatchError>;

    /// All items in insertion order.
    fn list_items(&self) -> Result<Vec<InventoryItem>, DispatchError>;

    /// Signed manual adjustment (restock, correction).
    fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<InventoryItem, DispatchError>;
}

impl<L> InventoryLedger for Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    fn add_item(&self, item: NewItem) -> Result<InventoryItem, DispatchError> {
        (**self).add_item(item)
    }

    fn get_item(&self, id: ItemId) -> Result<InventoryItem, DispatchError> {
        (**self).get_item(id)
    }

    fn list_items(&self) -> Result<Vec<InventoryItem>, DispatchError> {
        (**self).list_items()
    }

    fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<InventoryItem, DispatchError> {
        (**self).adjust_quantity(id, delta)
    }
}

/// `InventoryLedger` over item event streams.
#[derive(Debug)]
pub struct EventSourcedLedger<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
    retry: RetryPolicy,
}

impl<S, B> EventSourcedLedger<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(dispatcher: Arc<CommandDispatcher<S, B>>, retry: RetryPolicy) -> Self {
        Self { dispatcher, retry }
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher<S, B>> {
        &self.dispatcher
    }

    /// Current state of an item, or `None` if it was never added.
    pub(crate) fn load_for_sale(&self, id: ItemId) -> Result<Option<InventoryItem>, DispatchError> {
        let item = self.dispatcher.load(id.0, make_item)?;
        Ok(item.is_created().then_some(item))
    }

    /// Stage a sale decrement through the item's adjust primitive.
    ///
    /// `item` must be freshly loaded; it is advanced to its post-sale state.
    pub(crate) fn stage_sale_decrement(
        &self,
        item: &mut InventoryItem,
        quantity: i64,
        invoice_number: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<StreamAppend>, DispatchError> {
        let id = item.id_typed();
        let cmd = InventoryCommand::AdjustQuantity(AdjustQuantity {
            item_id: id,
            delta: -quantity,
            reason: AdjustmentReason::Sale {
                invoice_number: invoice_number.to_string(),
            },
            occurred_at: at,
        });
        self.dispatcher.stage(id.0, ITEM_AGGREGATE_TYPE, item, &cmd)
    }
}

fn make_item(id: AggregateId) -> InventoryItem {
    InventoryItem::empty(ItemId::new(id))
}

impl<S, B> InventoryLedger for EventSourcedLedger<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn add_item(&self, item: NewItem) -> Result<InventoryItem, DispatchError> {
        let item_id = ItemId::generate();
        let cmd = InventoryCommand::AddItem(AddItem {
            item_id,
            name: item.name,
            category: item.category,
            quantity: item.quantity,
            unit_price: item.unit_price,
            occurred_at: Utc::now(),
        });

        let added = self.dispatcher.dispatch_with_retry(
            &self.retry,
            item_id.0,
            ITEM_AGGREGATE_TYPE,
            &cmd,
            make_item,
        )?;

        info!(
            item_id = %added.id_typed(),
            name = added.name(),
            quantity = added.quantity(),
            "item added"
        );
        Ok(added)
    }

    fn get_item(&self, id: ItemId) -> Result<InventoryItem, DispatchError> {
        self.load_for_sale(id)?
            .ok_or_else(|| DispatchError::NotFound(format!("item {id}")))
    }

    fn list_items(&self) -> Result<Vec<InventoryItem>, DispatchError> {
        let events = self.dispatcher.load_all::<InventoryEvent>(ITEM_AGGREGATE_TYPE)?;

        let mut items: Vec<InventoryItem> = Vec::new();
        let mut index: HashMap<AggregateId, usize> = HashMap::new();

        for (aggregate_id, event) in events {
            let slot = *index.entry(aggregate_id).or_insert_with(|| {
                items.push(make_item(aggregate_id));
                items.len() - 1
            });
            items[slot].apply(&event);
        }

        Ok(items)
    }

    fn adjust_quantity(&self, id: ItemId, delta: i64) -> Result<InventoryItem, DispatchError> {
        let cmd = InventoryCommand::AdjustQuantity(AdjustQuantity {
            item_id: id,
            delta,
            reason: AdjustmentReason::Manual,
            occurred_at: Utc::now(),
        });

        let item = self.dispatcher.dispatch_with_retry(
            &self.retry,
            id.0,
            ITEM_AGGREGATE_TYPE,
            &cmd,
            make_item,
        )?;

        info!(item_id = %id, delta, quantity = item.quantity(), "quantity adjusted");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sportshub_events::InMemoryEventBus;

    use crate::event_store::InMemoryEventStore;

    type TestLedger = EventSourcedLedger<Arc<InMemoryEventStore>, InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn ledger() -> TestLedger {
        let dispatcher = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), InMemoryEventBus::new());
        EventSourcedLedger::new(Arc::new(dispatcher), RetryPolicy::default())
    }

    fn new_item(name: &str, quantity: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            category: Category::Balls,
            quantity,
            unit_price: Money::from(1500),
        }
    }

    #[test]
    fn add_then_get_returns_the_same_item() {
        let ledger = ledger();
        let added = ledger.add_item(new_item("Football", 15)).unwrap();

        let fetched = ledger.get_item(added.id_typed()).unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched.quantity(), 15);
        assert_eq!(fetched.unit_price(), Money::from(1500));
    }

    #[test]
    fn add_item_validates_input() {
        let ledger = ledger();
        assert!(matches!(
            ledger.add_item(new_item("", 1)),
            Err(DispatchError::Validation(_))
        ));
        assert!(matches!(
            ledger.add_item(new_item("Ball", -1)),
            Err(DispatchError::Validation(_))
        ));
        assert!(ledger.list_items().unwrap().is_empty());
    }

    #[test]
    fn unknown_items_are_not_found() {
        let ledger = ledger();
        assert!(matches!(
            ledger.get_item(ItemId::generate()),
            Err(DispatchError::NotFound(_))
        ));
        assert!(matches!(
            ledger.adjust_quantity(ItemId::generate(), 5),
            Err(DispatchError::NotFound(_))
        ));
    }

    #[test]
    fn list_items_keeps_insertion_order_and_latest_quantities() {
        let ledger = ledger();
        let a = ledger.add_item(new_item("Boots", 4)).unwrap();
        let b = ledger.add_item(new_item("Socks", 20)).unwrap();
        ledger.adjust_quantity(a.id_typed(), 6).unwrap();

        let items = ledger.list_items().unwrap();
        assert_eq!(
            items.iter().map(|i| i.name()).collect::<Vec<_>>(),
            vec!["Boots", "Socks"]
        );
        assert_eq!(items[0].quantity(), 10);
        assert_eq!(items[1].id_typed(), b.id_typed());
    }

    #[test]
    fn adjust_below_zero_is_rejected_and_leaves_quantity() {
        let ledger = ledger();
        let item = ledger.add_item(new_item("Medal", 2)).unwrap();

        assert!(matches!(
            ledger.adjust_quantity(item.id_typed(), -3),
            Err(DispatchError::Validation(_))
        ));
        assert_eq!(ledger.get_item(item.id_typed()).unwrap().quantity(), 2);

        let emptied = ledger.adjust_quantity(item.id_typed(), -2).unwrap();
        assert_eq!(emptied.quantity(), 0);
    }
}
