use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, FieldErrors, Money, ProductId};

pub const NAME_MAX_LEN: usize = 100;
pub const SKU_MAX_LEN: usize = 50;

/// Input for creating a product (admin action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sku: Option<String>,
}

/// Partial update of a product.
///
/// Only the fields that are `Some` are applied; the result is validated as a
/// whole before anything is written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub sku: Option<String>,
    pub active: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.sku.is_none()
            && self.active.is_none()
    }
}

/// Flat, storage-facing view of a product.
///
/// Persistence adapters read and write this shape; `Product::from_record`
/// trusts it (it was validated when it was written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
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

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub(crate) id: ProductId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) price: Money,
    pub(crate) stock: u32,
    pub(crate) sku: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new, active product.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let product = Self {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            stock: input.stock,
            sku: normalize_sku(input.sku),
            image_url: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn from_record(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            price: record.price,
            stock: record.stock,
            sku: record.sku,
            image_url: record.image_url,
            active: record.active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            sku: self.sku.clone(),
            image_url: self.image_url.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", "Name is required");
        } else if self.name.chars().count() > NAME_MAX_LEN {
            errors.add("name", format!("Name must be at most {NAME_MAX_LEN} characters"));
        }

        if !self.price.is_positive() {
            errors.add("price", "Price must be greater than zero");
        } else if self.price > Money::PRICE_MAX {
            errors.add("price", format!("Price must be at most {}", Money::PRICE_MAX));
        }

        if let Some(sku) = &self.sku {
            if sku.chars().count() > SKU_MAX_LEN {
                errors.add("sku", format!("SKU must be at most {SKU_MAX_LEN} characters"));
            }
        }

        errors.into_result()
    }

    /// Apply a partial update. Nothing changes unless the updated product is valid.
    pub fn update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if update.is_empty() {
            return Err(DomainError::validation("update", "no fields to update"));
        }

        let mut candidate = self.clone();
        if let Some(name) = update.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            candidate.description = description;
        }
        if let Some(price) = update.price {
            candidate.price = price;
        }
        if let Some(stock) = update.stock {
            candidate.stock = stock;
        }
        if update.sku.is_some() {
            candidate.sku = normalize_sku(update.sku);
        }
        if let Some(active) = update.active {
            candidate.active = active;
        }
        candidate.validate()?;

        candidate.updated_at = now;
        *self = candidate;
        Ok(())
    }

    /// Soft delete.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::business_rule("product is already inactive"));
        }
        self.active = false;
        self.updated_at = now;
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.active {
            return Err(DomainError::business_rule("product is already active"));
        }
        self.active = true;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the image URL, returning the previous one (if any) so the
    /// caller can remove the old file.
    pub fn replace_image(&mut self, url: String, now: DateTime<Utc>) -> Option<String> {
        self.updated_at = now;
        self.image_url.replace(url)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn normalize_sku(sku: Option<String>) -> Option<String> {
    sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
