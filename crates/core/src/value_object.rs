//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// `Money` is the canonical example here: two amounts of `1500` are the same
/// amount wherever they came from, while two items named "Football" are still
/// different items.
///
/// Value objects are immutable; "changing" one means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
