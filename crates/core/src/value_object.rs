//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; to
/// "modify" one, build a new one. A rental period is the canonical example
/// here: two periods with the same start and end are the same period.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
