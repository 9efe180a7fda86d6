// Error types for the pricing engine and the rule administration surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::error::ErrorResponse;

/// Main error type for pricing operations
///
/// Calculation itself never fails; these variants come from loading products
/// and rules, and from validating rule edits.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Rule or product retrieval failed
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Price rule not found: {0}")]
    RuleNotFound(i32),

    /// A stored rule that cannot be decoded; such rules are inert
    #[error("Malformed price rule {rule_id}: {reason}")]
    MalformedRule { rule_id: i32, reason: String },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Rule target references a category or product that does not exist
    #[error("Invalid scope target: {0}")]
    InvalidScopeTarget(String),
}

impl From<validator::ValidationErrors> for PricingError {
    fn from(err: validator::ValidationErrors) -> Self {
        PricingError::ValidationError(err.to_string())
    }
}

impl PricingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PricingError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PricingError::ProductNotFound(_) | PricingError::RuleNotFound(_) => StatusCode::NOT_FOUND,
            PricingError::MalformedRule { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PricingError::ValidationError(_) | PricingError::InvalidScopeTarget(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PricingError::DatabaseError(_) => "DATABASE_ERROR",
            PricingError::ProductNotFound(_) | PricingError::RuleNotFound(_) => "NOT_FOUND",
            PricingError::MalformedRule { .. } => "MALFORMED_RULE",
            PricingError::ValidationError(_) => "VALIDATION_ERROR",
            PricingError::InvalidScopeTarget(_) => "INVALID_SCOPE_TARGET",
        }
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let message = match &self {
            PricingError::DatabaseError(e) => {
                tracing::error!("Pricing data access failed: {}", e);
                "A database error occurred".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse::new(self.error_code(), message).into_response_with(self.status_code())
    }
}
