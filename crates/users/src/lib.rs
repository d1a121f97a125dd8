//! User profiles.
//!
//! Authentication lives with the identity provider; this crate only keeps the
//! profile data the storefront shows and edits. A profile is keyed by the
//! identity provider's subject id, so `Principal::user_id` addresses it
//! directly.

pub mod user;

pub use user::{NewUser, ProfileUpdate, User, UserRecord};
