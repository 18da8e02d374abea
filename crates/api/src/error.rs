//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders::OrderServiceError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// Error from the order service.
    #[error(transparent)]
    Service(#[from] OrderServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Service(err) => service_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: OrderServiceError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        OrderServiceError::OrderNotFound(_)
        | OrderServiceError::ProductNotFound(_)
        | OrderServiceError::NotificationNotFound(_) => {
            (StatusCode::NOT_FOUND, serde_json::json!({ "error": message }))
        }
        OrderServiceError::InsufficientStock {
            product_id,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            serde_json::json!({
                "error": message,
                "product_id": product_id,
                "requested": requested,
                "available": available,
            }),
        ),
        OrderServiceError::AlreadyCancelled(_) => {
            (StatusCode::CONFLICT, serde_json::json!({ "error": message }))
        }
        OrderServiceError::Validation(_) => {
            (StatusCode::BAD_REQUEST, serde_json::json!({ "error": message }))
        }
        OrderServiceError::TransactionAborted(_) => {
            tracing::error!(error = %message, "transaction aborted");
            (StatusCode::CONFLICT, serde_json::json!({ "error": message }))
        }
    }
}
