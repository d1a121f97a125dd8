//! Product catalog management.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_auth::{Principal, require_admin};
use storefront_catalog::{NewProduct, Product, ProductUpdate};
use storefront_core::{DomainError, ProductId};

use super::ServiceError;
use crate::file_storage::FileStorage;
use crate::pagination::Page;
use crate::store::{ProductQuery, Store};

/// Largest accepted product image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const IMAGE_FOLDER: &str = "products";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn validate(&self) -> Result<(), DomainError> {
        if self.bytes.is_empty() {
            return Err(DomainError::validation("image", "Image file is empty"));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(DomainError::validation(
                "image",
                format!("Image must be at most {MAX_IMAGE_BYTES} bytes"),
            ));
        }
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(DomainError::validation(
                "content_type",
                format!("Image type must be one of: {}", ALLOWED_IMAGE_TYPES.join(", ")),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStorage>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, files: Arc<dyn FileStorage>) -> Self {
        Self { store, files }
    }

    #[instrument(skip(self, principal, input), fields(user_id = %principal.user_id), err)]
    pub async fn create_product(
        &self,
        principal: &Principal,
        input: NewProduct,
    ) -> Result<Product, ServiceError> {
        require_admin(principal, "create products")?;
        let product = Product::create(input, Utc::now())?;

        let mut uow = self.store.begin().await?;
        uow.insert_product(&product).await?;
        uow.commit().await?;

        tracing::info!(product_id = %product.id_typed(), "product created");
        Ok(product)
    }

    #[instrument(skip(self, principal, update), fields(user_id = %principal.user_id), err)]
    pub async fn update_product(
        &self,
        principal: &Principal,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        require_admin(principal, "update products")?;
        let mut uow = self.store.begin().await?;

        let mut product = uow
            .lock_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        product.update(update, Utc::now())?;

        uow.save_product(&product).await?;
        uow.commit().await?;
        Ok(product)
    }

    /// Soft delete: the product disappears from public queries but stays
    /// referenced by existing order items.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id), err)]
    pub async fn deactivate_product(
        &self,
        principal: &Principal,
        id: ProductId,
    ) -> Result<Product, ServiceError> {
        require_admin(principal, "delete products")?;
        let mut uow = self.store.begin().await?;

        let mut product = uow
            .lock_product(id)
            .await?
            .filter(Product::is_active)
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        product.deactivate(Utc::now())?;

        uow.save_product(&product).await?;
        uow.commit().await?;

        tracing::info!("product deactivated");
        Ok(product)
    }

    /// Undo a soft delete.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id), err)]
    pub async fn activate_product(
        &self,
        principal: &Principal,
        id: ProductId,
    ) -> Result<Product, ServiceError> {
        require_admin(principal, "restore products")?;
        let mut uow = self.store.begin().await?;

        let mut product = uow
            .lock_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        product.activate(Utc::now())?;

        uow.save_product(&product).await?;
        uow.commit().await?;

        tracing::info!("product reactivated");
        Ok(product)
    }

    /// Public lookup; inactive products are reported as missing.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        let mut uow = self.store.begin().await?;
        uow.get_product(id)
            .await?
            .filter(Product::is_active)
            .ok_or_else(|| DomainError::not_found("Product", id).into())
    }

    pub async fn list_products(&self, query: ProductQuery) -> Result<Page<Product>, ServiceError> {
        query.validate()?;
        let mut uow = self.store.begin().await?;
        Ok(uow.list_products(&query).await?)
    }

    /// Upload a new product image and point the product at it.
    ///
    /// The previous image is deleted only after the new URL is committed; a
    /// failed delete is logged and otherwise ignored.
    #[instrument(
        skip(self, principal, upload),
        fields(user_id = %principal.user_id, size = upload.bytes.len()),
        err
    )]
    pub async fn set_product_image(
        &self,
        principal: &Principal,
        id: ProductId,
        upload: ImageUpload,
    ) -> Result<Product, ServiceError> {
        require_admin(principal, "upload product images")?;
        upload.validate()?;

        let mut uow = self.store.begin().await?;
        let mut product = uow
            .lock_product(id)
            .await?
            .filter(Product::is_active)
            .ok_or_else(|| DomainError::not_found("Product", id))?;

        let stored = self
            .files
            .upload(IMAGE_FOLDER, &upload.filename, &upload.content_type, upload.bytes)
            .await?;

        let previous = product.replace_image(stored.url.clone(), Utc::now());
        let persisted = match uow.save_product(&product).await {
            Ok(()) => uow.commit().await,
            Err(err) => Err(err),
        };
        if let Err(err) = persisted {
            if let Err(cleanup) = self.files.delete(&stored.url).await {
                tracing::warn!(url = %stored.url, error = %cleanup, "failed to remove orphaned upload");
            }
            return Err(err.into());
        }

        if let Some(old) = previous {
            if let Err(err) = self.files.delete(&old).await {
                tracing::warn!(url = %old, error = %err, "failed to delete previous product image");
            }
        }

        tracing::info!(url = %stored.url, "product image updated");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload {
            filename: "photo.png".to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    #[test]
    fn accepts_known_image_types() {
        for content_type in ALLOWED_IMAGE_TYPES {
            assert!(upload(content_type, vec![1, 2, 3]).validate().is_ok());
        }
        assert!(upload("IMAGE/PNG", vec![1]).validate().is_ok());
    }

    #[test]
    fn rejects_empty_oversized_and_non_image_uploads() {
        match upload("image/png", Vec::new()).validate().unwrap_err() {
            DomainError::Validation(errors) => assert!(errors.get("image").is_some()),
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(upload("image/png", vec![0; MAX_IMAGE_BYTES + 1]).validate().is_err());
        match upload("application/pdf", vec![1]).validate().unwrap_err() {
            DomainError::Validation(errors) => assert!(errors.get("content_type").is_some()),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }
}
