//! Domain error model.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Field-level validation messages, keyed by field name.
///
/// Ordered so that rendered messages (and API payloads) are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no field failed, otherwise a `Validation` error carrying all of them.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input, with per-field detail.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A business rule was violated.
    #[error("business rule violation: {0}")]
    BusinessRule(String),

    /// Not enough stock to satisfy a reservation.
    #[error(
        "insufficient inventory for product '{product_name}' (requested: {requested}, available: {available})"
    )]
    InsufficientInventory {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// A status change that the lifecycle does not allow.
    #[error("invalid status transition for {entity} from '{from}' to '{to}'")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// A stale write (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is not permitted to perform the operation.
    #[error("not authorized: {0}")]
    Unauthorized(String),
}

impl DomainError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        Self::BusinessRule(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_in_field_order() {
        let mut errors = FieldErrors::new();
        errors.add("price", "Price must be greater than zero");
        errors.add("name", "Name is required");

        let err = DomainError::Validation(errors);
        assert_eq!(
            err.to_string(),
            "validation failed: name: Name is required; price: Price must be greater than zero"
        );
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn insufficient_inventory_message_carries_counts() {
        let err = DomainError::InsufficientInventory {
            product_id: ProductId::new(),
            product_name: "Widget".into(),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient inventory for product 'Widget' (requested: 3, available: 1)"
        );
    }
}
