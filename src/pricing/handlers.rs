// HTTP handlers for live price lookup and engine metrics

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::{AdminUser, TokenService};
use crate::pricing::error::PricingError;
use crate::pricing::metrics::MetricsSummary;
use crate::pricing::result::PriceResult;
use crate::pricing::service::PriceEngine;

/// State for the price routes
#[derive(Clone)]
pub struct PricingState {
    pub engine: Arc<PriceEngine>,
    pub tokens: Arc<TokenService>,
}

impl FromRef<PricingState> for Arc<TokenService> {
    fn from_ref(state: &PricingState) -> Self {
        state.tokens.clone()
    }
}

/// Query parameters for a price lookup
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceQuery {
    /// Reserved for dealer-specific pricing; currently has no effect
    pub dealer_id: Option<i32>,
    /// Evaluation instant (RFC 3339); defaults to now
    #[param(value_type = Option<String>, example = "2026-06-01T08:00:00Z")]
    pub at: Option<DateTime<Utc>>,
}

/// Handler for GET /api/products/:id/price
#[utoipa::path(
    get,
    path = "/api/products/{id}/price",
    params(
        ("id" = i32, Path, description = "Product ID"),
        PriceQuery
    ),
    responses(
        (status = 200, description = "Live computed price with applied rules", body = PriceResult),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "pricing"
)]
pub async fn get_product_price(
    State(state): State<PricingState>,
    Path(product_id): Path<i32>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceResult>, PricingError> {
    let at = query.at.unwrap_or_else(Utc::now);
    tracing::debug!("Pricing product {} at {}", product_id, at);

    let result = state.engine.price_product(product_id, query.dealer_id, at).await?;
    Ok(Json(result))
}

/// Handler for GET /api/admin/pricing/metrics (Admin only)
#[utoipa::path(
    get,
    path = "/api/admin/pricing/metrics",
    responses(
        (status = 200, description = "Engine counters since startup", body = MetricsSummary),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "pricing"
)]
pub async fn get_pricing_metrics(
    State(state): State<PricingState>,
    AdminUser(admin): AdminUser,
) -> Json<MetricsSummary> {
    tracing::debug!("Pricing metrics requested by user {}", admin.user_id);
    state.engine.metrics().log_summary();
    Json(state.engine.metrics().summary())
}

pub fn routes(state: PricingState) -> Router {
    Router::new()
        .route("/api/products/:id/price", get(get_product_price))
        .route("/api/admin/pricing/metrics", get(get_pricing_metrics))
        .with_state(state)
}
