//! Order placement, cancellation and lifecycle updates.
//!
//! ## Consistency
//!
//! Placement locks every requested product row (ascending id order), checks
//! and reserves stock on the locked rows, then writes stock and the new order
//! in the same unit of work. Any failure drops the unit of work, so either
//! everything is committed or nothing is.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Span, instrument};

use storefront_auth::{Principal, ensure_owner_or_admin, require_admin};
use storefront_catalog::Product;
use storefront_core::{
    Address, DomainError, ExpectedVersion, OrderId, ProductId,
};
use storefront_orders::{Order, OrderLine, OrderStatus, StockRelease};

use super::ServiceError;
use crate::pagination::Page;
use crate::store::{OrderFilter, OrderQuery, Store, UnitOfWork};

/// One requested line: which product and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: Address,
    #[serde(default)]
    pub notes: String,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
}

/// Validate requested lines and merge repeated products, keeping first-seen order.
fn merge_lines(items: &[OrderLineRequest]) -> Result<Vec<(ProductId, u32)>, DomainError> {
    if items.is_empty() {
        return Err(DomainError::business_rule(
            "order must contain at least one item",
        ));
    }

    let mut merged: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());
    for (idx, line) in items.iter().enumerate() {
        if line.quantity == 0 {
            return Err(DomainError::validation(
                format!("items[{idx}].quantity"),
                "Quantity must be greater than zero",
            ));
        }
        match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => {
                *qty = qty.checked_add(line.quantity).ok_or_else(|| {
                    DomainError::validation(format!("items[{idx}].quantity"), "Quantity is too large")
                })?;
            }
            None => merged.push((line.product_id, line.quantity)),
        }
    }
    Ok(merged)
}

/// Return released stock to each product, locking rows in ascending id order.
async fn apply_release(
    uow: &mut dyn UnitOfWork,
    release: &StockRelease,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    for line in &release.lines {
        let mut product = uow
            .lock_product(line.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", line.product_id))?;
        product.release_stock(line.quantity, now)?;
        uow.save_product_stock(&product).await?;
    }
    Ok(())
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Load an order the principal may see. Orders owned by someone else are
    /// reported as missing.
    async fn load_visible(
        uow: &mut dyn UnitOfWork,
        principal: &Principal,
        id: OrderId,
        lock: bool,
    ) -> Result<Order, ServiceError> {
        let order = if lock {
            uow.lock_order(id).await?
        } else {
            uow.get_order(id).await?
        };
        let order = order.ok_or_else(|| DomainError::not_found("Order", id))?;

        if ensure_owner_or_admin(principal, order.user_id()).is_err() {
            tracing::debug!(order_id = %id, user_id = %principal.user_id, "order hidden from non-owner");
            return Err(DomainError::not_found("Order", id).into());
        }
        Ok(order)
    }

    #[instrument(
        skip(self, principal, request),
        fields(user_id = %principal.user_id, lines = request.items.len(), order_id = tracing::field::Empty),
        err
    )]
    pub async fn place_order(
        &self,
        principal: &Principal,
        request: PlaceOrder,
    ) -> Result<Order, ServiceError> {
        let requested = merge_lines(&request.items)?;
        request.shipping_address.validate()?;
        let now = Utc::now();

        let mut uow = self.store.begin().await?;

        let mut lock_order: Vec<ProductId> = requested.iter().map(|(id, _)| *id).collect();
        lock_order.sort();

        let mut products: BTreeMap<ProductId, Product> = BTreeMap::new();
        for id in lock_order {
            // Inactive products cannot be ordered and are reported as missing.
            let product = uow
                .lock_product(id)
                .await?
                .filter(Product::is_active)
                .ok_or_else(|| DomainError::not_found("Product", id))?;
            products.insert(id, product);
        }

        // Reserve against the locked copies; nothing is written until every line fits.
        let mut lines = Vec::with_capacity(requested.len());
        for (id, quantity) in &requested {
            let product = products
                .get_mut(id)
                .ok_or_else(|| DomainError::not_found("Product", id))?;
            product.reserve_stock(*quantity, now)?;
            lines.push(OrderLine {
                product_id: *id,
                product_name: product.name().to_string(),
                quantity: *quantity,
                price: product.price(),
            });
        }

        let order = Order::place(
            principal.user_id,
            request.shipping_address,
            request.notes,
            lines,
            now,
        )?;

        for product in products.values() {
            uow.save_product_stock(product).await?;
        }
        let order = uow.create_order(&order).await?;
        uow.commit().await?;

        Span::current().record("order_id", tracing::field::display(order.id_typed()));
        tracing::info!(total = %order.total_amount(), items = order.items().len(), "order placed");
        Ok(order)
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.user_id), err)]
    pub async fn cancel_order(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> Result<Order, ServiceError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;

        let mut order = Self::load_visible(uow.as_mut(), principal, id, true).await?;
        let expected = ExpectedVersion::of(&order);

        let release = order.cancel(now)?;
        apply_release(uow.as_mut(), &release, now).await?;

        let order = uow.update_order(&order, expected).await?;
        uow.commit().await?;

        tracing::info!(released_units = release.total_units(), "order cancelled");
        Ok(order)
    }

    /// Admin lifecycle update. Entering `cancelled` releases stock in the same unit of work.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id), err)]
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, ServiceError> {
        require_admin(principal, "update order status")?;
        let now = Utc::now();
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .lock_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;
        let expected = ExpectedVersion::of(&order);
        let from = order.status();

        if let Some(release) = order.update_status(target, now)? {
            apply_release(uow.as_mut(), &release, now).await?;
        }

        let order = uow.update_order(&order, expected).await?;
        uow.commit().await?;

        tracing::info!(%from, to = %target, "order status updated");
        Ok(order)
    }

    #[instrument(skip(self, principal, tracking_number), fields(user_id = %principal.user_id), err)]
    pub async fn set_tracking_number(
        &self,
        principal: &Principal,
        id: OrderId,
        tracking_number: String,
    ) -> Result<Order, ServiceError> {
        require_admin(principal, "set tracking number")?;
        let now = Utc::now();
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .lock_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;
        let expected = ExpectedVersion::of(&order);
        order.set_tracking_number(tracking_number, now)?;

        let order = uow.update_order(&order, expected).await?;
        uow.commit().await?;
        Ok(order)
    }

    pub async fn get_order(&self, principal: &Principal, id: OrderId) -> Result<Order, ServiceError> {
        let mut uow = self.store.begin().await?;
        Self::load_visible(uow.as_mut(), principal, id, false).await
    }

    /// Admins see every order; everyone else sees only their own. Newest first.
    pub async fn list_orders(
        &self,
        principal: &Principal,
        query: OrderQuery,
    ) -> Result<Page<Order>, ServiceError> {
        let filter = OrderFilter {
            user_id: (!principal.is_admin()).then_some(principal.user_id),
            status: query.status,
            page: query.page,
        };
        let mut uow = self.store.begin().await?;
        Ok(uow.list_orders(&filter).await?)
    }
}
