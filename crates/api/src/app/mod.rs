//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service construction shared by handlers
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and query parsing
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Paging};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices, jwt_secret: String) -> Router {
    let jwt = Arc::new(storefront_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };
    let services = Arc::new(services);

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}

/// Router backed by the in-memory store and file storage.
pub fn build_in_memory_app(jwt_secret: String) -> Router {
    build_app(AppServices::in_memory(), jwt_secret)
}
