//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use orders::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed principal headers.
    Unauthorized(String),
    /// The principal may not perform the operation.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// Catalog error.
    Catalog(CatalogError),
    /// Order ledger error.
    Order(OrderError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    let status = match &err {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CatalogError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CatalogError::InvalidCoordinates { .. }
        | CatalogError::InvalidPrice { .. }
        | CatalogError::InvalidField { .. } => StatusCode::BAD_REQUEST,
        CatalogError::Database(_) => {
            tracing::error!(error = %err, "catalog storage error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    let status = match &err {
        OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
        OrderError::Forbidden { .. } => StatusCode::FORBIDDEN,
        OrderError::EmptyOrder
        | OrderError::InvalidQuantity { .. }
        | OrderError::BelowMinimumOrder { .. } => StatusCode::BAD_REQUEST,
        // Retryable conflicts: depleted stock, illegal transition, or a
        // lost race the caller can safely resubmit.
        OrderError::InsufficientStock { .. }
        | OrderError::ItemUnavailable { .. }
        | OrderError::InvalidTransition { .. }
        | OrderError::ConcurrentModification { .. }
        | OrderError::Reconciler(_) => StatusCode::CONFLICT,
        OrderError::Catalog(inner) => return catalog_error_to_response_ref(inner, &err),
        OrderError::Database(_) | OrderError::Serialization(_) => {
            tracing::error!(error = %err, "order storage error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn catalog_error_to_response_ref(inner: &CatalogError, outer: &OrderError) -> (StatusCode, String) {
    let status = match inner {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CatalogError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CatalogError::InvalidCoordinates { .. }
        | CatalogError::InvalidPrice { .. }
        | CatalogError::InvalidField { .. } => StatusCode::BAD_REQUEST,
        CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, outer.to_string())
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
