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

use storefront_core::UserId;
use storefront_users::{NewUser, ProfileUpdate};

use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

/// `POST /users/me`: create the caller's profile.
pub async fn register_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.users.register_profile(principal.principal(), body).await {
        Ok(u) => (StatusCode::CREATED, Json(dto::UserResponse::from(&u))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.users.me(principal.principal()).await {
        Ok(u) => Json(dto::UserResponse::from(&u)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.users.update_me(principal.principal(), body).await {
        Ok(u) => Json(dto::UserResponse::from(&u)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    params: Result<Query<dto::UserListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection_to_response(e),
    };
    let query = params.into_query(services.paging);

    match services.users.list_users(principal.principal(), query).await {
        Ok(page) => Json(page.map(|u| dto::UserResponse::from(&u))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.users.get_user(principal.principal(), id).await {
        Ok(u) => Json(dto::UserResponse::from(&u)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.users.deactivate_user(principal.principal(), id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
