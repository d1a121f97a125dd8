use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Entity, FieldErrors, Money, OrderId, OrderItemId, ProductId};

/// A line to be added to an order: product reference plus the name and unit
/// price captured from the catalog at this moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
}

impl OrderLine {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.product_name.trim().is_empty() {
            errors.add("product_name", "Product name is required");
        }
        if self.quantity == 0 {
            errors.add("quantity", "Quantity must be greater than zero");
        }
        if !self.price.is_positive() {
            errors.add("price", "Price must be greater than zero");
        } else if self.price > Money::PRICE_MAX {
            errors.add("price", format!("Price must be at most {}", Money::PRICE_MAX));
        }
        errors.into_result()
    }
}

/// Order line owned by an `Order`.
///
/// `product_name` and `price` are snapshots: later catalog changes never
/// alter them. `subtotal` is kept equal to `price * quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    price: Money,
    subtotal: Money,
}

impl OrderItem {
    pub(crate) fn from_line(order_id: OrderId, line: OrderLine) -> DomainResult<Self> {
        Self::rehydrate(
            OrderItemId::new(),
            order_id,
            line.product_id,
            line.product_name,
            line.quantity,
            line.price,
        )
    }

    /// Rebuild a persisted item. Fails only if the subtotal overflows.
    pub fn rehydrate(
        id: OrderItemId,
        order_id: OrderId,
        product_id: ProductId,
        product_name: String,
        quantity: u32,
        price: Money,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            order_id,
            product_id,
            product_name,
            quantity,
            price,
            subtotal: price.checked_mul(quantity)?,
        })
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) -> DomainResult<()> {
        self.subtotal = self.price.checked_mul(quantity)?;
        self.quantity = quantity;
        Ok(())
    }
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
