//! User profiles.
//!
//! A profile is keyed by the identity-provider subject of the caller, so the
//! authenticated principal always maps to at most one profile.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_auth::{Principal, ensure_owner_or_admin, require_admin};
use storefront_core::{DomainError, UserId};
use storefront_users::{NewUser, ProfileUpdate, User};

use super::ServiceError;
use crate::pagination::Page;
use crate::store::{Store, UserQuery};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create the caller's own profile. A second registration is a conflict,
    /// as is an email that already belongs to another profile.
    #[instrument(skip(self, principal, input), fields(user_id = %principal.user_id), err)]
    pub async fn register_profile(
        &self,
        principal: &Principal,
        input: NewUser,
    ) -> Result<User, ServiceError> {
        let user = User::register(principal.user_id, input, Utc::now())?;

        let mut uow = self.store.begin().await?;
        if uow.lock_user(principal.user_id).await?.is_some() {
            return Err(DomainError::conflict("profile is already registered").into());
        }
        uow.insert_user(&user).await?;
        uow.commit().await?;

        tracing::info!("user profile registered");
        Ok(user)
    }

    pub async fn me(&self, principal: &Principal) -> Result<User, ServiceError> {
        let mut uow = self.store.begin().await?;
        let user = uow
            .get_user(principal.user_id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| DomainError::not_found("User", principal.user_id))?;
        Ok(user)
    }

    #[instrument(skip(self, principal, update), fields(user_id = %principal.user_id), err)]
    pub async fn update_me(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<User, ServiceError> {
        let mut uow = self.store.begin().await?;
        let mut user = uow
            .lock_user(principal.user_id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| DomainError::not_found("User", principal.user_id))?;
        user.update_profile(update, Utc::now())?;

        uow.save_user(&user).await?;
        uow.commit().await?;
        Ok(user)
    }

    /// Owners and admins only; anyone else is refused outright.
    pub async fn get_user(&self, principal: &Principal, id: UserId) -> Result<User, ServiceError> {
        ensure_owner_or_admin(principal, id)?;
        let mut uow = self.store.begin().await?;
        let user = uow
            .get_user(id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        Ok(user)
    }

    pub async fn list_users(
        &self,
        principal: &Principal,
        query: UserQuery,
    ) -> Result<Page<User>, ServiceError> {
        require_admin(principal, "list users")?;
        let mut uow = self.store.begin().await?;
        Ok(uow.list_users(&query).await?)
    }

    /// Soft delete.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id, target = %id), err)]
    pub async fn deactivate_user(
        &self,
        principal: &Principal,
        id: UserId,
    ) -> Result<User, ServiceError> {
        require_admin(principal, "delete users")?;
        let mut uow = self.store.begin().await?;

        let mut user = uow
            .lock_user(id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        user.deactivate(Utc::now())?;

        uow.save_user(&user).await?;
        uow.commit().await?;

        tracing::info!("user deactivated");
        Ok(user)
    }
}
