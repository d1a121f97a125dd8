//! `storefront-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error taxonomy and the shared value objects.

pub mod address;
pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use address::Address;
pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::{OrderId, OrderItemId, ProductId, UserId};
pub use money::Money;
pub use value_object::ValueObject;
