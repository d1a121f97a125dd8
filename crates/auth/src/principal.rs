use serde::Serialize;

use storefront_core::UserId;

use crate::claims::JwtClaims;
use crate::Role;

/// An authenticated caller, as established by the surrounding auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
        }
    }
}
