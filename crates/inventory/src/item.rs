use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sportshub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use sportshub_events::Event;

use crate::category::Category;

/// Stream type for item aggregates in the event store.
pub const ITEM_AGGREGATE_TYPE: &str = "inventory.item";

/// Quantity at or below which an item is reported as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Inventory item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Aggregate root: InventoryItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    category: Category,
    quantity: i64,
    unit_price: Money,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            name: String::new(),
            category: Category::Others,
            quantity: 0,
            unit_price: Money::ZERO,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Derived flag; never stored.
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity <= threshold
    }
}

impl AggregateRoot for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Why a quantity changed. Recorded on every adjustment for auditability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Direct edit (restock, stock count correction).
    Manual,
    /// Decrement applied by a committed sale.
    Sale { invoice_number: String },
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub item_id: ItemId,
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustQuantity (signed delta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustQuantity {
    pub item_id: ItemId,
    pub delta: i64,
    pub reason: AdjustmentReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    AddItem(AddItem),
    AdjustQuantity(AdjustQuantity),
}

/// Event: ItemAdded (carries the initial stocked quantity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub item_id: ItemId,
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityAdjusted {
    pub item_id: ItemId,
    pub delta: i64,
    pub quantity_after: i64,
    pub reason: AdjustmentReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemAdded(ItemAdded),
    QuantityAdjusted(QuantityAdjusted),
}

impl InventoryEvent {
    pub fn item_id(&self) -> ItemId {
        match self {
            InventoryEvent::ItemAdded(e) => e.item_id,
            InventoryEvent::QuantityAdjusted(e) => e.item_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemAdded(_) => "inventory.item.added",
            InventoryEvent::QuantityAdjusted(_) => "inventory.item.quantity_adjusted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemAdded(e) => e.occurred_at,
            InventoryEvent::QuantityAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemAdded(e) => {
                self.id = e.item_id;
                self.name = e.name.clone();
                self.category = e.category;
                self.quantity = e.quantity;
                self.unit_price = e.unit_price;
                self.created = true;
            }
            InventoryEvent::QuantityAdjusted(e) => {
                self.quantity += e.delta;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::AddItem(cmd) => self.handle_add(cmd),
            InventoryCommand::AdjustQuantity(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_item_id(&self, item_id: ItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if !cmd.unit_price.is_positive() {
            return Err(DomainError::validation("unit_price must be positive"));
        }

        Ok(vec![InventoryEvent::ItemAdded(ItemAdded {
            item_id: cmd.item_id,
            name: name.to_string(),
            category: cmd.category,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustQuantity) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("item {}", cmd.item_id)));
        }
        self.ensure_item_id(cmd.item_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let quantity_after = self
            .quantity
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("quantity overflow"))?;

        if quantity_after < 0 {
            return Err(match &cmd.reason {
                AdjustmentReason::Sale { .. } => {
                    DomainError::insufficient_stock(self.id.0, -cmd.delta, self.quantity)
                }
                AdjustmentReason::Manual => DomainError::validation(format!(
                    "quantity cannot go negative (on hand: {}, delta: {})",
                    self.quantity, cmd.delta
                )),
            });
        }

        Ok(vec![InventoryEvent::QuantityAdjusted(QuantityAdjusted {
            item_id: cmd.item_id,
            delta: cmd.delta,
            quantity_after,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn add_cmd(item_id: ItemId, quantity: i64, unit_price: i64) -> InventoryCommand {
        InventoryCommand::AddItem(AddItem {
            item_id,
            name: "Football".to_string(),
            category: Category::Balls,
            quantity,
            unit_price: Money::from(unit_price),
            occurred_at: test_time(),
        })
    }

    fn adjust_cmd(item_id: ItemId, delta: i64, reason: AdjustmentReason) -> InventoryCommand {
        InventoryCommand::AdjustQuantity(AdjustQuantity {
            item_id,
            delta,
            reason,
            occurred_at: test_time(),
        })
    }

    fn stocked_item(quantity: i64) -> InventoryItem {
        let item_id = ItemId::generate();
        let mut item = InventoryItem::empty(item_id);
        let events = item.handle(&add_cmd(item_id, quantity, 1500)).unwrap();
        for e in &events {
            item.apply(e);
        }
        item
    }

    #[test]
    fn add_item_emits_item_added_with_initial_quantity() {
        let item_id = ItemId::generate();
        let item = InventoryItem::empty(item_id);

        let events = item.handle(&add_cmd(item_id, 15, 1500)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            InventoryEvent::ItemAdded(e) => {
                assert_eq!(e.item_id, item_id);
                assert_eq!(e.quantity, 15);
                assert_eq!(e.unit_price, Money::from(1500));
                assert_eq!(e.category, Category::Balls);
            }
            _ => panic!("Expected ItemAdded event"),
        }
    }

    #[test]
    fn add_item_trims_the_name() {
        let item_id = ItemId::generate();
        let cmd = InventoryCommand::AddItem(AddItem {
            item_id,
            name: "  Shin Guards ".to_string(),
            category: Category::Equipment,
            quantity: 0,
            unit_price: Money::from(800),
            occurred_at: test_time(),
        });

        let mut item = InventoryItem::empty(item_id);
        let events = item.handle(&cmd).unwrap();
        item.apply(&events[0]);
        assert_eq!(item.name(), "Shin Guards");
        assert_eq!(item.quantity(), 0);
    }

    #[test]
    fn add_item_rejects_invalid_input() {
        let item_id = ItemId::generate();
        let item = InventoryItem::empty(item_id);

        let blank = InventoryCommand::AddItem(AddItem {
            item_id,
            name: "   ".to_string(),
            category: Category::Balls,
            quantity: 1,
            unit_price: Money::from(1),
            occurred_at: test_time(),
        });
        assert!(matches!(item.handle(&blank), Err(DomainError::Validation(_))));
        assert!(matches!(
            item.handle(&add_cmd(item_id, -1, 10)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            item.handle(&add_cmd(item_id, 1, 0)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            item.handle(&add_cmd(item_id, 1, -5)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn adding_twice_is_a_conflict() {
        let item = stocked_item(3);
        let err = item.handle(&add_cmd(item.id_typed(), 3, 10)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn adjust_on_missing_item_is_not_found() {
        let item_id = ItemId::generate();
        let item = InventoryItem::empty(item_id);
        let err = item
            .handle(&adjust_cmd(item_id, 5, AdjustmentReason::Manual))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn manual_adjust_below_zero_is_a_validation_error() {
        let item = stocked_item(4);
        let err = item
            .handle(&adjust_cmd(item.id_typed(), -5, AdjustmentReason::Manual))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn sale_adjust_below_zero_reports_available_quantity() {
        let item = stocked_item(4);
        let reason = AdjustmentReason::Sale {
            invoice_number: "INV-9".to_string(),
        };
        let err = item
            .handle(&adjust_cmd(item.id_typed(), -5, reason))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::insufficient_stock(item.id_typed().0, 5, 4)
        );
    }

    #[test]
    fn adjust_records_quantity_after() {
        let mut item = stocked_item(15);
        let events = item
            .handle(&adjust_cmd(
                item.id_typed(),
                -3,
                AdjustmentReason::Sale {
                    invoice_number: "INV-1".to_string(),
                },
            ))
            .unwrap();

        match &events[0] {
            InventoryEvent::QuantityAdjusted(e) => assert_eq!(e.quantity_after, 12),
            _ => panic!("Expected QuantityAdjusted event"),
        }

        item.apply(&events[0]);
        assert_eq!(item.quantity(), 12);
        assert_eq!(item.version(), 2);
    }

    #[test]
    fn zero_delta_is_rejected() {
        let item = stocked_item(1);
        let err = item
            .handle(&adjust_cmd(item.id_typed(), 0, AdjustmentReason::Manual))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn low_stock_uses_an_inclusive_threshold() {
        assert!(stocked_item(10).is_low_stock(DEFAULT_LOW_STOCK_THRESHOLD));
        assert!(!stocked_item(11).is_low_stock(DEFAULT_LOW_STOCK_THRESHOLD));
    }

    #[test]
    fn events_round_trip_through_json() {
        let item = stocked_item(2);
        let events = item
            .handle(&adjust_cmd(
                item.id_typed(),
                -1,
                AdjustmentReason::Sale {
                    invoice_number: "INV-7".to_string(),
                },
            ))
            .unwrap();

        let json = serde_json::to_value(&events[0]).unwrap();
        let back: InventoryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, events[0]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of accepted adjustments can drive quantity below zero,
        /// and the replayed quantity equals initial + sum of accepted deltas.
        #[test]
        fn quantity_never_negative(
            initial in 0i64..100,
            deltas in prop::collection::vec(-50i64..50, 0..40)
        ) {
            let mut item = stocked_item(initial);
            let mut expected = initial;

            for delta in deltas {
                match item.handle(&adjust_cmd(item.id_typed(), delta, AdjustmentReason::Manual)) {
                    Ok(events) => {
                        for e in &events {
                            item.apply(e);
                        }
                        expected += delta;
                    }
                    Err(DomainError::Validation(_)) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
                prop_assert!(item.quantity() >= 0);
            }

            prop_assert_eq!(item.quantity(), expected);
        }
    }
}
