//! `storefront-auth` — authentication/authorization boundary.
//!
//! Tokens are issued elsewhere; this crate verifies them and turns their
//! claims into a `Principal`. It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, ensure_owner_or_admin, require_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
