//! Query parameters for catalog, order and user listings.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Money, UserId};
use storefront_orders::OrderStatus;

use crate::pagination::PageRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    Price,
    #[default]
    CreatedAt,
}

impl FromStr for ProductSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ProductSort::Name),
            "price" => Ok(ProductSort::Price),
            "created_at" => Ok(ProductSort::CreatedAt),
            _ => Err(DomainError::validation(
                "sort_by",
                "sort_by must be one of: name, price, created_at",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(DomainError::validation("order", "order must be one of: asc, desc")),
        }
    }
}

/// Catalog listing query. Only active products are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort_by: ProductSort,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl ProductQuery {
    /// Trimmed, non-empty search term.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(DomainError::validation(
                    "min_price",
                    "min_price must not exceed max_price",
                ));
            }
        }
        Ok(())
    }
}

/// Caller-facing order listing query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub page: PageRequest,
}

/// Storage-level order filter; `user_id` is set by the service for non-admins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub page: PageRequest,
}

/// Admin user listing. Only active profiles are listed, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Case-insensitive substring match over email, first and last name.
    pub search: Option<String>,
    pub page: PageRequest,
}

impl UserQuery {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
