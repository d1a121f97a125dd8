//! Persistence boundary.
//!
//! A [`Store`] hands out [`UnitOfWork`]s. Everything read or written through a
//! unit of work becomes visible atomically on [`UnitOfWork::commit`]; dropping
//! it without committing rolls back.
//!
//! ## Locking
//!
//! `lock_product` / `lock_order` take a row lock that is held until the unit
//! of work ends, so check-then-reserve on `Product.stock` is atomic per row.
//! Callers lock several products in ascending id order. `lock_user` serializes
//! profile edits the same way.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::Product;
use storefront_core::{ExpectedVersion, OrderId, ProductId, UserId};
use storefront_orders::Order;
use storefront_users::User;

use crate::pagination::Page;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderFilter, OrderQuery, ProductQuery, ProductSort, SortOrder, UserQuery};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row expected to exist inside the unit of work is missing.
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint or stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back to the domain.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Connection, pool or driver failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// One atomic unit of work.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read a product without locking it.
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Read a product and hold its row lock until the unit of work ends.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Persist every mutable product field.
    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Persist the stock level only.
    async fn save_product_stock(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn list_products(&mut self, query: &ProductQuery) -> Result<Page<Product>, StoreError>;

    /// Insert a new order with its items; returns it at version 1.
    async fn create_order(&mut self, order: &Order) -> Result<Order, StoreError>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Write the order and its items; bumps the version.
    async fn update_order(
        &mut self,
        order: &Order,
        expected: ExpectedVersion,
    ) -> Result<Order, StoreError>;

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Page<Order>, StoreError>;

    /// Conflict when the id or the email is already taken.
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn lock_user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Active users matching the query, newest first.
    async fn list_users(&mut self, query: &UserQuery) -> Result<Page<User>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
