use thiserror::Error;

use storefront_core::{DomainError, UserId};

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0} requires the admin role")]
    AdminRequired(&'static str),

    #[error("forbidden: caller does not own this resource")]
    NotOwner,
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::unauthorized(value.to_string())
    }
}

/// Pure policy check: no IO, no panics.
pub fn require_admin(principal: &Principal, action: &'static str) -> Result<(), AuthzError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired(action))
    }
}

/// Allow the resource owner or any admin.
pub fn ensure_owner_or_admin(principal: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
