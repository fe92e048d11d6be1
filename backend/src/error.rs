//! Error handling for the Warehouse Sales service
//!
//! Every service returns [`AppError`]. Validation failures are deterministic
//! and reported as rejected requests; storage and contention failures are
//! transient and flagged as retryable.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::PurchaseRejection;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Purchase validation errors
    #[error("Product {product_id} not found in warehouse {warehouse_id}")]
    ProductNotFoundInWarehouse { warehouse_id: Uuid, product_id: Uuid },

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },

    // Input validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Transient errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StorageUnavailable(_) | AppError::ConcurrencyConflict(_)
        )
    }
}

impl From<PurchaseRejection> for AppError {
    fn from(rejection: PurchaseRejection) -> Self {
        match rejection {
            PurchaseRejection::ProductNotFoundInWarehouse {
                warehouse_id,
                product_id,
            } => AppError::ProductNotFoundInWarehouse {
                warehouse_id,
                product_id,
            },
            PurchaseRejection::InsufficientStock {
                product_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            PurchaseRejection::InvalidQuantity {
                product_id,
                quantity,
            } => AppError::InvalidQuantity {
                product_id,
                quantity,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("path", rejection.body_text())
    }
}

// SQLSTATE codes surfaced as contention
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const QUERY_CANCELED: &str = "57014";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().map(|c| c.into_owned());
            let constraint = db_err.constraint().unwrap_or("record").to_string();
            let message = db_err.message().to_string();

            match code.as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE | QUERY_CANCELED) => {
                    return AppError::ConcurrencyConflict(message);
                }
                Some(UNIQUE_VIOLATION) => return AppError::DuplicateEntry(constraint),
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::NotFound("Warehouse or product".to_string());
                }
                Some(CHECK_VIOLATION | NUMERIC_VALUE_OUT_OF_RANGE) => {
                    return AppError::Validation {
                        field: constraint,
                        message,
                    };
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::StorageUnavailable(err.to_string()),
            other => AppError::DatabaseError(other),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ProductNotFoundInWarehouse { .. } => {
                (StatusCode::BAD_REQUEST, "PRODUCT_NOT_FOUND_IN_WAREHOUSE")
            }
            AppError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
            AppError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
            AppError::Validation { .. } | AppError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::DuplicateEntry(_) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::StorageUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_UNAVAILABLE")
            }
            AppError::ConcurrencyConflict(_) => (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, field) = match &self {
            AppError::Validation { field, message } => (message.clone(), Some(field.clone())),
            AppError::ValidationError(errors) => {
                let field = errors.field_errors().keys().next().map(|f| f.to_string());
                (self.to_string(), field)
            }
            AppError::InvalidQuantity { .. } => (self.to_string(), Some("quantity".to_string())),
            AppError::DuplicateEntry(what) => (format!("A record with this {} already exists", what), None),
            AppError::NotFound(resource) => (format!("{} not found", resource), None),
            // Internal details stay in the logs
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalError(_) => ("An internal server error occurred".to_string(), None),
            _ => (self.to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
                retryable: self.is_retryable(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
