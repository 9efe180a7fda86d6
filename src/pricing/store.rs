// Catalog store seam
//
// The engine reads products and candidate rules through this trait and never
// writes to it. `CatalogRepository` (catalog/repository.rs) is the Postgres
// implementation.

use async_trait::async_trait;

use crate::pricing::error::PricingError;
use crate::pricing::rule::PriceRule;
use crate::pricing::types::PricedProduct;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Product pricing fields plus its current category memberships
    async fn find_product(&self, product_id: i32) -> Result<Option<PricedProduct>, PricingError>;

    /// Global rules, rules for any of the product's categories, and rules for
    /// the product itself. Activity and validity windows are not filtered here.
    async fn candidate_rules(&self, product: &PricedProduct) -> Result<Vec<PriceRule>, PricingError>;
}
