use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use storefront_infra::services::catalog::MAX_IMAGE_BYTES;

pub mod orders;
pub mod products;
pub mod system;
pub mod users;

/// Router for endpoints that need no authentication.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/products", post(products::create_product))
        .route(
            "/products/:id",
            axum::routing::patch(products::update_product).delete(products::delete_product),
        )
        .route("/products/:id/activate", post(products::activate_product))
        .route(
            "/products/:id/image",
            put(products::set_product_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/orders/:id/tracking", put(orders::set_tracking_number))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/users", get(users::list_users))
        .route(
            "/users/me",
            get(users::get_me).post(users::register_me).put(users::update_me),
        )
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
}

/// Parse a path identifier, mapping failures to a 400 response.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = storefront_core::DomainError>,
{
    raw.parse()
        .map_err(crate::app::errors::domain_error_to_response)
}
