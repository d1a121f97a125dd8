//! Postal address value object.

use serde::{Deserialize, Serialize};

use crate::error::{DomainResult, FieldErrors};
use crate::value_object::ValueObject;

/// Shipping address. Owned entirely by the order that references it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ValueObject for Address {}

impl Address {
    /// Build a validated address; every component must be non-blank.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> DomainResult<Self> {
        let address = Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        };
        address.validate()?;
        Ok(address)
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let fields = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                errors.add(format!("shipping_address.{field}"), "is required");
            }
        }
        errors.into_result()
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}
