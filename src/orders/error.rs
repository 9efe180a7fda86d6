use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ErrorResponse;
use crate::orders::snapshot::{is_snapshot_violation, violated_snapshot_field, SNAPSHOT_FALLBACK_FIELD};
use crate::pricing::error::PricingError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    NotFound,

    #[error("Order item not found")]
    ItemNotFound,

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Attempt to change a frozen price snapshot column
    #[error("Order line field '{0}' is immutable once the line is created")]
    SnapshotImmutable(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        if is_snapshot_violation(&err) {
            tracing::warn!("Snapshot trigger rejected an order line update: {}", err);
            let field = err
                .as_database_error()
                .map_or(SNAPSHOT_FALLBACK_FIELD, |db_err| violated_snapshot_field(db_err.message()));
            return OrderError::SnapshotImmutable(field.to_string());
        }
        OrderError::DatabaseError(err.to_string())
    }
}

impl From<PricingError> for OrderError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::ProductNotFound(id) => OrderError::ProductNotFound(id),
            PricingError::DatabaseError(e) => e.into(),
            other => OrderError::DatabaseError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for OrderError {
    fn from(err: validator::ValidationErrors) -> Self {
        OrderError::ValidationError(err.to_string())
    }
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::NotFound | OrderError::ItemNotFound => StatusCode::NOT_FOUND,
            OrderError::ProductNotFound(_) | OrderError::ValidationError(_) => StatusCode::BAD_REQUEST,
            OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrderError::SnapshotImmutable(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            OrderError::DatabaseError(msg) => {
                tracing::error!("Order data access failed: {}", msg);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            OrderError::NotFound | OrderError::ItemNotFound => {
                ErrorResponse::new("NOT_FOUND", self.to_string())
            }
            OrderError::ProductNotFound(id) => ErrorResponse::new("PRODUCT_NOT_FOUND", self.to_string())
                .with_details(json!({ "product_id": id })),
            OrderError::Forbidden(_) => ErrorResponse::new("FORBIDDEN", self.to_string()),
            OrderError::ValidationError(_) => ErrorResponse::new("VALIDATION_ERROR", self.to_string()),
            OrderError::SnapshotImmutable(field) => {
                ErrorResponse::new("SNAPSHOT_IMMUTABLE", self.to_string())
                    .with_details(json!({ "field": field }))
            }
        };

        body.into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_immutable_is_conflict() {
        let err = OrderError::SnapshotImmutable("price_rules_snapshot".to_string());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Order line field 'price_rules_snapshot' is immutable once the line is created"
        );
    }

    #[test]
    fn test_pricing_errors_map_to_order_errors() {
        let err: OrderError = PricingError::ProductNotFound(8).into();
        assert!(matches!(err, OrderError::ProductNotFound(8)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: OrderError = PricingError::DatabaseError(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, OrderError::DatabaseError(_)));
    }
}
