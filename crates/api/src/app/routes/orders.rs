use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use storefront_core::OrderId;
use storefront_infra::services::PlaceOrder;
use storefront_orders::OrderStatus;

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<PlaceOrder>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.orders.place_order(principal.principal(), body).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::OrderResponse::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    params: Result<Query<dto::OrderListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection_to_response(e),
    };
    let query = match params.into_query(services.paging) {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders.list_orders(principal.principal(), query).await {
        Ok(page) => Json(page.map(|o| dto::OrderResponse::from(&o))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.get_order(principal.principal(), id).await {
        Ok(order) => Json(dto::OrderResponse::from(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStatusRequest>, JsonRejection>,
) -> Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let target: OrderStatus = match body.status.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .orders
        .update_status(principal.principal(), id, target)
        .await
    {
        Ok(order) => Json(dto::OrderResponse::from(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_tracking_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::TrackingRequest>, JsonRejection>,
) -> Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services
        .orders
        .set_tracking_number(principal.principal(), id, body.tracking_number)
        .await
    {
        Ok(order) => Json(dto::OrderResponse::from(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.cancel_order(principal.principal(), id).await {
        Ok(order) => Json(dto::OrderResponse::from(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
