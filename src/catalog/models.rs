use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::pricing::result::PriceResult;
use crate::pricing::types::PricedProduct;

/// Product row as stored in the `products` table
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub custom_price: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product joined with its category memberships
#[derive(Debug, Clone)]
pub struct Product {
    pub row: ProductRow,
    pub category_ids: Vec<i32>,
}

impl Product {
    pub fn priced(&self) -> PricedProduct {
        PricedProduct {
            id: self.row.id,
            base_price: self.row.base_price,
            custom_price: self.row.custom_price,
            category_ids: self.category_ids.clone(),
        }
    }
}

/// Storefront view of a product with its live computed price
///
/// `price` is recomputed on every read and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "BRK-2231")]
    pub sku: String,
    #[schema(example = "Front brake pads")]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "120.00")]
    pub base_price: Decimal,
    #[schema(value_type = Option<String>, example = "110.00")]
    pub custom_price: Option<Decimal>,
    pub category_ids: Vec<i32>,
    pub price: PriceResult,
}

impl ProductResponse {
    pub fn new(product: Product, price: PriceResult) -> Self {
        Self {
            id: product.row.id,
            sku: product.row.sku,
            name: product.row.name,
            description: product.row.description,
            base_price: product.row.base_price,
            custom_price: product.row.custom_price,
            category_ids: product.category_ids,
            price,
        }
    }
}
