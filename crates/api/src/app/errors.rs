use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use storefront_core::DomainError;
use storefront_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            internal_error()
        }
        ServiceError::FileStorage(e) => {
            tracing::error!(error = %e, "file storage failure");
            internal_error()
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(fields) => {
            let details: Map<String, Value> = fields
                .iter()
                .map(|(field, msg)| (field.to_string(), Value::String(msg.to_string())))
                .collect();
            json_error_with_details(
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                Value::Object(details),
            )
        }
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::BusinessRule(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "business_rule_violation", message)
        }
        DomainError::InsufficientInventory {
            product_id,
            requested,
            available,
            ..
        } => json_error_with_details(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_inventory",
            message,
            json!({
                "product_id": product_id.to_string(),
                "requested": requested,
                "available": available,
            }),
        ),
        DomainError::InvalidStatusTransition { from, to, .. } => json_error_with_details(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_status_transition",
            message,
            json!({ "from": from, "to": to }),
        ),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Unauthorized(_) => json_error(StatusCode::FORBIDDEN, "forbidden", message),
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

fn internal_error() -> Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "an internal error occurred",
    )
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Value,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_infra::store::StoreError;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let cases = [
            (DomainError::validation("name", "Name is required"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("bad"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("Order", "x"), StatusCode::NOT_FOUND),
            (DomainError::business_rule("no"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                DomainError::InvalidStatusTransition {
                    entity: "Order",
                    from: "delivered".into(),
                    to: "pending".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::conflict("stale"), StatusCode::CONFLICT),
            (DomainError::unauthorized("admin only"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn storage_failures_are_opaque_500s() {
        let res = service_error_to_response(ServiceError::Storage(StoreError::Backend(
            "password authentication failed".into(),
        )));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
