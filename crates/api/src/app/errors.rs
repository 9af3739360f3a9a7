use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use sportshub_core::DomainError;
use sportshub_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DispatchError::DuplicateInvoice(invoice) => json_error(
            StatusCode::CONFLICT,
            "duplicate_invoice",
            format!("invoice number {invoice} has already been used"),
        ),
        DispatchError::InsufficientStock {
            item_id,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": format!("insufficient stock for item {item_id}: requested {requested}, available {available}"),
                "itemId": item_id.to_string(),
                "requested": requested,
                "available": available,
            })),
        )
            .into_response(),
        DispatchError::Conflict(msg) | DispatchError::Concurrency(msg) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "invariant_violation", msg)
        }
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => {
            tracing::error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    dispatch_error_to_response(DispatchError::from(err))
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
