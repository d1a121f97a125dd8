//! Per-product stock ledger.
//!
//! Stock is a non-negative count. A decrease that would take it below zero is
//! refused with `InsufficientInventory` and leaves the count untouched.

use chrono::{DateTime, Utc};

use storefront_core::{DomainError, DomainResult};

use crate::product::Product;

impl Product {
    /// Apply a signed stock delta.
    pub fn adjust_stock(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let next = if delta < 0 {
            let requested = delta.unsigned_abs();
            if requested > u64::from(self.stock) {
                return Err(DomainError::InsufficientInventory {
                    product_id: self.id,
                    product_name: self.name.clone(),
                    requested: u32::try_from(requested).unwrap_or(u32::MAX),
                    available: self.stock,
                });
            }
            // requested <= stock, so it fits in u32.
            self.stock - requested as u32
        } else {
            u32::try_from(delta)
                .ok()
                .and_then(|added| self.stock.checked_add(added))
                .ok_or_else(|| DomainError::business_rule("stock level would overflow"))?
        };

        self.stock = next;
        self.updated_at = now;
        Ok(())
    }

    /// Take `quantity` units out of stock for an order line.
    pub fn reserve_stock(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        self.adjust_stock(-i64::from(quantity), now)
    }

    /// Return `quantity` previously reserved units to stock.
    pub fn release_stock(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        self.adjust_stock(i64::from(quantity), now)
    }
}
