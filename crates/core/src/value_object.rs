//! Value object trait: equality by value, not identity.
//!
//! Item names and quantities are value objects: two names that normalize to the
//! same text are the same name, and a quantity is nothing but its number.

/// Marker trait for value objects.
///
/// Implementors are immutable and compared by value. Constructors are expected to
/// validate, so that an instance always satisfies its invariants; "changing" a
/// value object means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
