//! In-memory store for dev and tests.
//!
//! One async mutex guards all state. A unit of work holds the guard for its
//! whole lifetime and mutates a staged copy, which replaces the live state on
//! commit. Units of work are therefore fully serialized.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use storefront_catalog::Product;
use storefront_core::{AggregateRoot, ExpectedVersion, OrderId, ProductId, UserId};
use storefront_orders::Order;
use storefront_users::User;

use super::query::{OrderFilter, ProductQuery, ProductSort, SortOrder, UserQuery};
use super::{Store, StoreError, UnitOfWork};
use crate::pagination::Page;

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
}

impl State {
    fn email_taken(&self, email: &str, except: UserId) -> bool {
        self.users
            .values()
            .any(|u| u.id_typed() != except && u.email().eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

fn with_version(order: &Order, version: u64) -> Order {
    let mut record = order.to_record();
    record.version = version;
    Order::from_record(record)
}

fn matches_query(product: &Product, query: &ProductQuery, needle: Option<&str>) -> bool {
    if !product.is_active() {
        return false;
    }
    if let Some(min) = query.min_price {
        if product.price() < min {
            return false;
        }
    }
    if let Some(max) = query.max_price {
        if product.price() > max {
            return false;
        }
    }
    match needle {
        Some(needle) => {
            product.name().to_lowercase().contains(needle)
                || product.description().to_lowercase().contains(needle)
        }
        None => true,
    }
}

fn compare_products(a: &Product, b: &Product, sort: ProductSort) -> Ordering {
    let primary = match sort {
        ProductSort::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        ProductSort::Price => a.price().cmp(&b.price()),
        ProductSort::CreatedAt => a.created_at().cmp(&b.created_at()),
    };
    primary.then_with(|| a.id_typed().cmp(&b.id_typed()))
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        // The whole store is already held by this unit of work.
        self.get_product(id).await
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let id = product.id_typed();
        if self.staged.products.contains_key(&id) {
            return Err(StoreError::Conflict(format!("product {id} already exists")));
        }
        if let Some(sku) = product.sku() {
            if self.staged.products.values().any(|p| p.sku() == Some(sku)) {
                return Err(StoreError::Conflict(format!("SKU '{sku}' is already in use")));
            }
        }
        self.staged.products.insert(id, product.clone());
        Ok(())
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let id = product.id_typed();
        if let Some(sku) = product.sku() {
            if self
                .staged
                .products
                .values()
                .any(|p| p.id_typed() != id && p.sku() == Some(sku))
            {
                return Err(StoreError::Conflict(format!("SKU '{sku}' is already in use")));
            }
        }
        let slot = self.staged.products.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "Product",
            id: id.to_string(),
        })?;
        *slot = product.clone();
        Ok(())
    }

    async fn save_product_stock(&mut self, product: &Product) -> Result<(), StoreError> {
        let id = product.id_typed();
        let stored = self.staged.products.get(&id).ok_or_else(|| StoreError::NotFound {
            entity: "Product",
            id: id.to_string(),
        })?;
        let mut record = stored.to_record();
        record.stock = product.stock();
        record.updated_at = product.updated_at();
        self.staged.products.insert(id, Product::from_record(record));
        Ok(())
    }

    async fn list_products(&mut self, query: &ProductQuery) -> Result<Page<Product>, StoreError> {
        let needle = query.search_term().map(str::to_lowercase);
        let mut matching: Vec<Product> = self
            .staged
            .products
            .values()
            .filter(|p| matches_query(p, query, needle.as_deref()))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare_products(a, b, query.sort_by);
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        Ok(Page::from_sorted(matching, query.page))
    }

    async fn create_order(&mut self, order: &Order) -> Result<Order, StoreError> {
        let id = order.id_typed();
        if self.staged.orders.contains_key(&id) {
            return Err(StoreError::Conflict(format!("order {id} already exists")));
        }
        let created = with_version(order, 1);
        self.staged.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.get_order(id).await
    }

    async fn update_order(
        &mut self,
        order: &Order,
        expected: ExpectedVersion,
    ) -> Result<Order, StoreError> {
        let id = order.id_typed();
        let current = self.staged.orders.get(&id).ok_or_else(|| StoreError::NotFound {
            entity: "Order",
            id: id.to_string(),
        })?;
        let current_version = current.version();
        if !expected.matches(current_version) {
            return Err(StoreError::Conflict(format!(
                "order {id} is at version {current_version}, expected {expected:?}"
            )));
        }

        let updated = with_version(order, current_version + 1);
        self.staged.orders.insert(id, updated.clone());
        Ok(updated)
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Page<Order>, StoreError> {
        let mut matching: Vec<Order> = self
            .staged
            .orders
            .values()
            .filter(|o| filter.user_id.is_none_or(|u| o.user_id() == u))
            .filter(|o| filter.status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();

        // Newest first; ids are time-ordered, so they break ties stably.
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });

        Ok(Page::from_sorted(matching, filter.page))
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        let id = user.id_typed();
        if self.staged.users.contains_key(&id) {
            return Err(StoreError::Conflict(format!("user {id} already exists")));
        }
        if self.staged.email_taken(user.email(), id) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email()
            )));
        }
        self.staged.users.insert(id, user.clone());
        Ok(())
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        self.get_user(id).await
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        let id = user.id_typed();
        if self.staged.email_taken(user.email(), id) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email()
            )));
        }
        let slot = self.staged.users.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "User",
            id: id.to_string(),
        })?;
        *slot = user.clone();
        Ok(())
    }

    async fn list_users(&mut self, query: &UserQuery) -> Result<Page<User>, StoreError> {
        let needle = query.search_term().map(str::to_lowercase);
        let mut matching: Vec<User> = self
            .staged
            .users
            .values()
            .filter(|u| u.is_active())
            .filter(|u| match needle.as_deref() {
                Some(needle) => [u.email(), u.first_name(), u.last_name()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle)),
                None => true,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });

        Ok(Page::from_sorted(matching, query.page))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
