//! Service wiring shared by every handler.

use std::sync::Arc;

use storefront_infra::file_storage::{FileStorage, InMemoryFileStorage};
use storefront_infra::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use storefront_infra::services::{CatalogService, OrderService, UserService};
use storefront_infra::store::{InMemoryStore, Store};

/// Page size limits applied to list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub users: UserService,
    pub paging: Paging,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, files: Arc<dyn FileStorage>, paging: Paging) -> Self {
        Self {
            catalog: CatalogService::new(store.clone(), files),
            orders: OrderService::new(store.clone()),
            users: UserService::new(store),
            paging,
        }
    }

    /// Everything in process memory (dev and tests).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryFileStorage::new()),
            Paging::default(),
        )
    }
}
