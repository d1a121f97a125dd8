use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    Address, AggregateRoot, DomainError, DomainResult, Money, OrderId, OrderItemId, ProductId,
    UserId,
};

use crate::item::{OrderItem, OrderLine};
use crate::status::OrderStatus;

pub const TRACKING_NUMBER_MAX_LEN: usize = 100;

/// Stock to hand back to the catalog, one line per product.
///
/// Produced by the aggregate when an order enters `cancelled`. Lines are
/// ordered by product id so callers can lock product rows in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRelease {
    pub lines: Vec<ReleaseLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockRelease {
    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// Flat, storage-facing view of an order and its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address: Address,
    pub tracking_number: Option<String>,
    pub notes: String,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total_amount: Money,
    shipping_address: Address,
    tracking_number: Option<String>,
    notes: String,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Create a new `pending` order from priced lines.
    ///
    /// Stock is not touched here; reserving it is the caller's job.
    pub fn place(
        user_id: UserId,
        shipping_address: Address,
        notes: String,
        lines: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::business_rule(
                "order must contain at least one item",
            ));
        }
        shipping_address.validate()?;
        for line in &lines {
            line.validate()?;
        }

        let id = OrderId::new();
        let items = lines
            .into_iter()
            .map(|line| OrderItem::from_line(id, line))
            .collect::<DomainResult<Vec<_>>>()?;
        let total_amount = total_of(&items)?;

        Ok(Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            total_amount,
            shipping_address,
            tracking_number: None,
            notes,
            items,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn from_record(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            status: record.status,
            total_amount: record.total_amount,
            shipping_address: record.shipping_address,
            tracking_number: record.tracking_number,
            notes: record.notes,
            items: record.items,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }

    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address.clone(),
            tracking_number: self.tracking_number.clone(),
            notes: self.notes.clone(),
            items: self.items.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn ensure_modifiable(&self, action: &str) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::business_rule(format!(
                "cannot {action} an order with status '{}'",
                self.status
            )));
        }
        Ok(())
    }

    fn item_position(&self, item_id: OrderItemId) -> DomainResult<usize> {
        self.items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or_else(|| DomainError::not_found("OrderItem", item_id))
    }

    /// Swap in a new item list, keeping the total in sync. Nothing changes
    /// if the new total is out of range.
    fn replace_items(&mut self, items: Vec<OrderItem>, now: DateTime<Utc>) -> DomainResult<()> {
        self.total_amount = total_of(&items)?;
        self.items = items;
        self.updated_at = now;
        Ok(())
    }

    pub fn add_item(&mut self, line: OrderLine, now: DateTime<Utc>) -> DomainResult<OrderItemId> {
        self.ensure_modifiable("add items to")?;
        line.validate()?;

        let item = OrderItem::from_line(self.id, line)?;
        let item_id = item.id();
        let mut items = self.items.clone();
        items.push(item);
        self.replace_items(items, now)?;
        Ok(item_id)
    }

    pub fn remove_item(
        &mut self,
        item_id: OrderItemId,
        now: DateTime<Utc>,
    ) -> DomainResult<OrderItem> {
        self.ensure_modifiable("remove items from")?;
        let pos = self.item_position(item_id)?;

        let mut items = self.items.clone();
        let removed = items.remove(pos);
        self.replace_items(items, now)?;
        Ok(removed)
    }

    pub fn update_item_quantity(
        &mut self,
        item_id: OrderItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_modifiable("update items in")?;
        if quantity == 0 {
            return Err(DomainError::validation(
                "quantity",
                "Quantity must be greater than zero",
            ));
        }
        let pos = self.item_position(item_id)?;

        let mut items = self.items.clone();
        items[pos].set_quantity(quantity)?;
        self.replace_items(items, now)
    }

    /// Recompute and store the total from the current items.
    pub fn calculate_total(&mut self) -> DomainResult<Money> {
        self.total_amount = total_of(&self.items)?;
        Ok(self.total_amount)
    }

    /// Move to `target`.
    ///
    /// Entering `cancelled` yields the stock to release; any other transition
    /// yields `None`.
    pub fn update_status(
        &mut self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<StockRelease>> {
        self.status = self.status.transition(target)?;
        self.updated_at = now;

        if target == OrderStatus::Cancelled {
            Ok(Some(self.stock_release()))
        } else {
            Ok(None)
        }
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<StockRelease> {
        match self.status {
            OrderStatus::Cancelled => Err(DomainError::business_rule("order is already cancelled")),
            OrderStatus::Delivered => Err(DomainError::business_rule("cannot cancel a delivered order")),
            _ => Ok(self
                .update_status(OrderStatus::Cancelled, now)?
                .unwrap_or_default()),
        }
    }

    pub fn set_tracking_number(
        &mut self,
        tracking_number: String,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let tracking_number = tracking_number.trim().to_string();
        if tracking_number.is_empty() {
            return Err(DomainError::validation(
                "tracking_number",
                "Tracking number is required",
            ));
        }
        if tracking_number.chars().count() > TRACKING_NUMBER_MAX_LEN {
            return Err(DomainError::validation(
                "tracking_number",
                format!("Tracking number must be at most {TRACKING_NUMBER_MAX_LEN} characters"),
            ));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::business_rule(
                "cannot set a tracking number on a cancelled order",
            ));
        }

        self.tracking_number = Some(tracking_number);
        self.updated_at = now;
        Ok(())
    }

    fn stock_release(&self) -> StockRelease {
        let mut per_product: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &self.items {
            let entry = per_product.entry(item.product_id()).or_default();
            *entry = entry.saturating_add(item.quantity());
        }
        StockRelease {
            lines: per_product
                .into_iter()
                .map(|(product_id, quantity)| ReleaseLine {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }
}

/// Sum of item subtotals, bounded by what an order row can store.
fn total_of(items: &[OrderItem]) -> DomainResult<Money> {
    let total = Money::checked_sum(items.iter().map(OrderItem::subtotal))?;
    if total > Money::TOTAL_MAX {
        return Err(DomainError::business_rule(format!(
            "order total {total} exceeds the maximum of {}",
            Money::TOTAL_MAX
        )));
    }
    Ok(total)
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
