use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::Product;
use storefront_core::{Address, DomainError, Money, OrderId, OrderItemId, ProductId, UserId};
use storefront_infra::pagination::PageRequest;
use storefront_infra::store::{OrderQuery, ProductQuery, ProductSort, SortOrder, UserQuery};
use storefront_orders::{Order, OrderItem, OrderStatus};
use storefront_users::User;

use crate::app::services::Paging;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub tracking_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
    pub filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub search: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductListParams {
    pub fn into_query(self, paging: Paging) -> Result<ProductQuery, DomainError> {
        Ok(ProductQuery {
            search: self.search,
            min_price: parse_price("min_price", self.min_price.as_deref())?,
            max_price: parse_price("max_price", self.max_price.as_deref())?,
            sort_by: self
                .sort_by
                .as_deref()
                .map(str::parse::<ProductSort>)
                .transpose()?
                .unwrap_or_default(),
            order: self
                .order
                .as_deref()
                .map(str::parse::<SortOrder>)
                .transpose()?
                .unwrap_or_default(),
            page: paging.request(self.page, self.per_page),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListParams {
    pub fn into_query(self, paging: Paging) -> Result<OrderQuery, DomainError> {
        Ok(OrderQuery {
            status: self.status.as_deref().map(str::parse::<OrderStatus>).transpose()?,
            page: paging.request(self.page, self.per_page),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl UserListParams {
    pub fn into_query(self, paging: Paging) -> UserQuery {
        UserQuery {
            search: self.search,
            page: paging.request(self.page, self.per_page),
        }
    }
}

fn parse_price(field: &'static str, raw: Option<&str>) -> Result<Option<Money>, DomainError> {
    raw.map(|raw| {
        raw.parse::<Money>()
            .map_err(|_| DomainError::validation(field, format!("{field} must be a decimal amount")))
    })
    .transpose()
}

impl Paging {
    fn request(self, page: Option<u32>, per_page: Option<u32>) -> PageRequest {
        PageRequest::new(page, per_page, self.default_size, self.max_size)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id_typed(),
            name: p.name().to_string(),
            description: p.description().to_string(),
            price: p.price(),
            stock: p.stock(),
            sku: p.sku().map(str::to_string),
            image_url: p.image_url().map(str::to_string),
            active: p.is_active(),
            created_at: p.created_at(),
            updated_at: p.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id(),
            product_id: item.product_id(),
            product_name: item.product_name().to_string(),
            quantity: item.quantity(),
            price: item.price(),
            subtotal: item.subtotal(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address: Address,
    pub tracking_number: Option<String>,
    pub notes: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id_typed(),
            user_id: o.user_id(),
            status: o.status(),
            total_amount: o.total_amount(),
            shipping_address: o.shipping_address().clone(),
            tracking_number: o.tracking_number().map(str::to_string),
            notes: o.notes().to_string(),
            items: o.items().iter().map(OrderItemResponse::from).collect(),
            created_at: o.created_at(),
            updated_at: o.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id_typed(),
            email: u.email().to_string(),
            first_name: u.first_name().to_string(),
            last_name: u.last_name().to_string(),
            full_name: u.full_name(),
            active: u.is_active(),
            created_at: u.created_at(),
            updated_at: u.updated_at(),
        }
    }
}
