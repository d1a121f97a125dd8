//! Postgres-backed store.
//!
//! Each unit of work is one `READ COMMITTED` transaction. `lock_product`,
//! `lock_order` and `lock_user` use `SELECT ... FOR UPDATE`, so a stock check made after the
//! lock sees the latest committed value and concurrent reservations against
//! the same row serialize.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |

use core::str::FromStr;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use storefront_catalog::{Product, ProductRecord};
use storefront_core::{
    Address, ExpectedVersion, Money, OrderId, OrderItemId, ProductId, UserId,
};
use storefront_orders::{Order, OrderItem, OrderRecord, OrderStatus};
use storefront_users::{User, UserRecord};

use super::query::{OrderFilter, ProductQuery, ProductSort, SortOrder, UserQuery};
use super::{Store, StoreError, UnitOfWork};
use crate::pagination::Page;

const SCHEMA: &str = include_str!("schema.sql");

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, sku, image_url, active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, shipping_street, shipping_city, \
     shipping_state, shipping_postal_code, shipping_country, tracking_number, notes, \
     created_at, updated_at, version";

const USER_COLUMNS: &str = "id, email, first_name, last_name, active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PostgresUnitOfWork {
    async fn fetch_product(
        &mut self,
        id: ProductId,
        for_update: bool,
    ) -> Result<Option<Product>, StoreError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn fetch_order(
        &mut self,
        id: OrderId,
        for_update: bool,
    ) -> Result<Option<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.fetch_items(&[*id.as_uuid()]).await?;
        let items = items.remove(id.as_uuid()).unwrap_or_default();
        order_from_row(&row, items).map(Some)
    }

    async fn fetch_user(&mut self, id: UserId, for_update: bool) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Items for the given orders, grouped by order id, in line order.
    async fn fetch_items(
        &mut self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch_items", e))?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = get(row, "order_id")?;
            grouped
                .entry(order_id)
                .or_default()
                .push(item_from_row(row)?);
        }
        Ok(grouped)
    }

    async fn insert_items(&mut self, order: &Order) -> Result<(), StoreError> {
        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(order.id_typed().as_uuid())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id().as_uuid())
            .bind(item.product_name())
            .bind(i64::from(item.quantity()))
            .bind(item.price().amount())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_product(id, false).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_product(id, true).await
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(product.id_typed().as_uuid())
            .bind(product.name())
            .bind(product.description())
            .bind(product.price().amount())
            .bind(i64::from(product.stock()))
            .bind(product.sku())
            .bind(product.image_url())
            .bind(product.is_active())
            .bind(product.created_at())
            .bind(product.updated_at())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock = $5, sku = $6,
                image_url = $7, active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().amount())
        .bind(i64::from(product.stock()))
        .bind(product.sku())
        .bind(product.image_url())
        .bind(product.is_active())
        .bind(product.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Product",
                id: product.id_typed().to_string(),
            });
        }
        Ok(())
    }

    #[instrument(
        skip(self, product),
        fields(product_id = %product.id_typed(), stock = product.stock()),
        err
    )]
    async fn save_product_stock(&mut self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = $2, updated_at = $3 WHERE id = $1")
            .bind(product.id_typed().as_uuid())
            .bind(i64::from(product.stock()))
            .bind(product.updated_at())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("save_product_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Product",
                id: product.id_typed().to_string(),
            });
        }
        Ok(())
    }

    #[instrument(
        skip(self, query),
        fields(page = query.page.page, per_page = query.page.per_page, returned = tracing::field::Empty),
        err
    )]
    async fn list_products(&mut self, query: &ProductQuery) -> Result<Page<Product>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_product_filters(&mut select, query);

        let column = match query.sort_by {
            ProductSort::Name => "LOWER(name)",
            ProductSort::Price => "price",
            ProductSort::CreatedAt => "created_at",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        select
            .push(format!(" ORDER BY {column} {direction}, id {direction}"))
            .push(" LIMIT ")
            .push_bind(to_i64(query.page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(query.page.offset()));

        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let items = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("returned", items.len());
        Ok(Page::new(items, total.max(0) as u64, query.page))
    }

    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), user_id = %order.user_id(), items = order.items().len()),
        err
    )]
    async fn create_order(&mut self, order: &Order) -> Result<Order, StoreError> {
        let mut record = order.to_record();
        record.version = 1;
        let address = &record.shipping_address;

        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(record.id.as_uuid())
            .bind(record.user_id.as_uuid())
            .bind(record.status.as_str())
            .bind(record.total_amount.amount())
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.postal_code)
            .bind(&address.country)
            .bind(record.tracking_number.as_deref())
            .bind(&record.notes)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(to_i64(record.version))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;

        let created = Order::from_record(record);
        self.insert_items(&created).await?;
        Ok(created)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_order(id, false).await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_order(id, true).await
    }

    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), status = %order.status(), expected_version = ?expected),
        err
    )]
    async fn update_order(
        &mut self,
        order: &Order,
        expected: ExpectedVersion,
    ) -> Result<Order, StoreError> {
        let id = order.id_typed();
        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("check_order_version", e))?;

        let current = current.ok_or_else(|| StoreError::NotFound {
            entity: "Order",
            id: id.to_string(),
        })?;
        let current = u64::try_from(current)
            .map_err(|_| StoreError::Corrupt(format!("negative version for order {id}")))?;
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "order {id} is at version {current}, expected {expected:?}"
            )));
        }

        let mut record = order.to_record();
        record.version = current + 1;
        let address = &record.shipping_address;

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, total_amount = $3, shipping_street = $4, shipping_city = $5,
                shipping_state = $6, shipping_postal_code = $7, shipping_country = $8,
                tracking_number = $9, notes = $10, updated_at = $11, version = $12
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.total_amount.amount())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(record.tracking_number.as_deref())
        .bind(&record.notes)
        .bind(record.updated_at)
        .bind(to_i64(record.version))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_items", e))?;

        let updated = Order::from_record(record);
        self.insert_items(&updated).await?;
        Ok(updated)
    }

    #[instrument(skip(self, filter), fields(page = filter.page.page, per_page = filter.page.per_page), err)]
    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Page<Order>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(to_i64(filter.page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(filter.page.offset()));

        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids = rows
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut items = self.fetch_items(&ids).await?;

        let orders = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| order_from_row(row, items.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(orders, total.max(0) as u64, filter.page))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id_typed()), err)]
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&sql)
            .bind(user.id_typed().as_uuid())
            .bind(user.email())
            .bind(user.first_name())
            .bind(user.last_name())
            .bind(user.is_active())
            .bind(user.created_at())
            .bind(user.updated_at())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_user(id, false).await
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn lock_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_user(id, true).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.id_typed()), err)]
    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4, active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id_typed().as_uuid())
        .bind(user.email())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.is_active())
        .bind(user.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "User",
                id: user.id_typed().to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, query), fields(page = query.page.page, per_page = query.page.per_page), err)]
    async fn list_users(&mut self, query: &UserQuery) -> Result<Page<User>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(to_i64(query.page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(query.page.offset()));

        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(users, total.max(0) as u64, query.page))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    qb.push(" WHERE active = TRUE");
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min.amount());
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max.amount());
    }
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(*user_id.as_uuid());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    qb.push(" WHERE active = TRUE");
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column '{column}': {e}")))
}

fn count_column(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = get(row, column)?;
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("column '{column}' out of range: {value}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product::from_record(ProductRecord {
        id: ProductId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        price: Money::new(get::<Decimal>(row, "price")?),
        stock: count_column(row, "stock")?,
        sku: get(row, "sku")?,
        image_url: get(row, "image_url")?,
        active: get(row, "active")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    }))
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    OrderItem::rehydrate(
        OrderItemId::from_uuid(get(row, "id")?),
        OrderId::from_uuid(get(row, "order_id")?),
        ProductId::from_uuid(get(row, "product_id")?),
        get(row, "product_name")?,
        count_column(row, "quantity")?,
        Money::new(get::<Decimal>(row, "price")?),
    )
    .map_err(|e| StoreError::Corrupt(format!("order item: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User::from_record(UserRecord {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        active: get(row, "active")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    }))
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let status: String = get(row, "status")?;
    let status = OrderStatus::from_str(&status)
        .map_err(|_| StoreError::Corrupt(format!("unknown order status '{status}'")))?;
    let version: i64 = get(row, "version")?;

    Ok(Order::from_record(OrderRecord {
        id: OrderId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        status,
        total_amount: Money::new(get::<Decimal>(row, "total_amount")?),
        shipping_address: Address {
            street: get(row, "shipping_street")?,
            city: get(row, "shipping_city")?,
            state: get(row, "shipping_state")?,
            postal_code: get(row, "shipping_postal_code")?,
            country: get(row, "shipping_country")?,
        },
        tracking_number: get(row, "tracking_number")?,
        notes: get(row, "notes")?,
        items,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Corrupt(format!("negative order version {version}")))?,
    }))
}

/// Map SQLx errors to `StoreError` with operation context.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation (e.g. duplicate SKU).
                Some("23505") => StoreError::Conflict(msg),
                // Check constraint violation.
                Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
