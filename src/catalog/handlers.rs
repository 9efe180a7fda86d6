// HTTP handlers for storefront product reads

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::catalog::models::ProductResponse;
use crate::pricing::error::PricingError;
use crate::AppState;

/// Handler for GET /api/products
/// Lists active products, each priced live at one shared instant
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "Active products with live prices", body = Vec<ProductResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "catalog"
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, PricingError> {
    let at = Utc::now();
    let products = state.catalog.list_active_products().await?;

    let mut responses = Vec::with_capacity(products.len());
    for product in products {
        let price = state.engine.calculate_at(&product.priced(), None, at).await?;
        responses.push(ProductResponse::new(product, price));
    }

    tracing::debug!("Priced {} products", responses.len());
    Ok(Json(responses))
}

/// Handler for GET /api/products/:id
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with live price", body = ProductResponse),
        (status = 404, description = "Product not found or inactive"),
        (status = 500, description = "Internal server error")
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>, PricingError> {
    let product = state
        .catalog
        .find_by_id(id)
        .await?
        .filter(|product| product.row.is_active)
        .ok_or_else(|| {
            tracing::debug!("Product with id {} not found", id);
            PricingError::ProductNotFound(id)
        })?;

    let price = state.engine.calculate(&product.priced(), None).await?;
    Ok(Json(ProductResponse::new(product, price)))
}
