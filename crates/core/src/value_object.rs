//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two values with the same attributes are
/// interchangeable (`Money`, `Address`). They are immutable; "changing" one
/// means building a new value.
///
/// ```ignore
/// let a = Money::from_cents(1000);
/// let b: Money = "10.00".parse()?;
/// assert_eq!(a, b); // equal by value
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
