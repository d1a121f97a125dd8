//! Application services: the use cases behind the HTTP API.
//!
//! Each operation runs inside one unit of work and returns typed results or a
//! [`ServiceError`]; mapping to transport responses is the caller's concern.

pub mod catalog;
pub mod orders;
pub mod users;

use thiserror::Error;

use storefront_auth::AuthzError;
use storefront_core::DomainError;

use crate::file_storage::FileStorageError;
use crate::store::StoreError;

pub use catalog::{CatalogService, ImageUpload};
pub use orders::{OrderLineRequest, OrderService, PlaceOrder};
pub use users::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business/domain failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failed for reasons unrelated to the request.
    #[error("storage failure: {0}")]
    Storage(StoreError),

    /// The file-storage collaborator failed.
    #[error("file storage failure: {0}")]
    FileStorage(#[from] FileStorageError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => {
                ServiceError::Domain(DomainError::NotFound { entity, id })
            }
            StoreError::Conflict(msg) => ServiceError::Domain(DomainError::Conflict(msg)),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}
