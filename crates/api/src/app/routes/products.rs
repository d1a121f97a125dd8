use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use storefront_catalog::{NewProduct, ProductUpdate};
use storefront_core::ProductId;
use storefront_infra::services::ImageUpload;

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ProductListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection_to_response(e),
    };
    let query = match params.into_query(services.paging) {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.list_products(query).await {
        Ok(page) => Json(page.map(|p| dto::ProductResponse::from(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.get_product(id).await {
        Ok(p) => Json(dto::ProductResponse::from(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.catalog.create_product(principal.principal(), body).await {
        Ok(p) => (StatusCode::CREATED, Json(dto::ProductResponse::from(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> Response {
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.catalog.update_product(principal.principal(), id, body).await {
        Ok(p) => Json(dto::ProductResponse::from(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.deactivate_product(principal.principal(), id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn activate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.activate_product(principal.principal(), id).await {
        Ok(p) => Json(dto::ProductResponse::from(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `PUT /products/:id/image`: the raw request body is the image, typed by `Content-Type`.
pub async fn set_product_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    params: Result<Query<dto::ImageParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection_to_response(e),
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let upload = ImageUpload {
        filename: params.filename.unwrap_or_else(|| "image".to_string()),
        content_type,
        bytes: body.to_vec(),
    };

    match services
        .catalog
        .set_product_image(principal.principal(), id, upload)
        .await
    {
        Ok(p) => Json(dto::ProductResponse::from(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
