use chrono::{DateTime, Utc};

/// A fact recorded by the shop: an item was added, a quantity moved, a sale
/// was recorded.
///
/// Events are never edited or removed once appended. Their payload format is
/// identified by `event_type` plus `schema_version`, so older stored payloads
/// can still be told apart after a format change.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<aggregate>.<what happened>`.
    fn event_type(&self) -> &'static str;

    /// Payload format revision. Bump when a field changes meaning.
    fn schema_version(&self) -> u32 {
        1
    }

    /// Business time of the fact. Sales reports bucket on this.
    fn occurred_at(&self) -> DateTime<Utc>;
}
