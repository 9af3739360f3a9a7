//! Inventory domain module (event-sourced).
//!
//! Business rules for stock-keeping items, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage). The item aggregate is the only
//! place an item's quantity can change.

pub mod category;
pub mod item;

pub use category::Category;
pub use item::{
    AddItem, AdjustQuantity, AdjustmentReason, InventoryCommand, InventoryEvent, InventoryItem,
    ItemAdded, ItemId, QuantityAdjusted, DEFAULT_LOW_STOCK_THRESHOLD, ITEM_AGGREGATE_TYPE,
};
