// Price Engine
//
// Loads a product's candidate rules from the catalog store and folds them with
// the pure calculation in engine.rs. Nothing is cached: every call re-reads the
// current rule set.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::pricing::engine;
use crate::pricing::error::PricingError;
use crate::pricing::metrics::PricingMetrics;
use crate::pricing::result::PriceResult;
use crate::pricing::store::CatalogStore;
use crate::pricing::types::PricedProduct;

pub struct PriceEngine {
    store: Arc<dyn CatalogStore>,
    metrics: PricingMetrics,
}

impl PriceEngine {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_metrics(store, PricingMetrics::new())
    }

    pub fn with_metrics(store: Arc<dyn CatalogStore>, metrics: PricingMetrics) -> Self {
        Self { store, metrics }
    }

    pub fn metrics(&self) -> &PricingMetrics {
        &self.metrics
    }

    /// Price `product` as of now
    pub async fn calculate(
        &self,
        product: &PricedProduct,
        dealer_id: Option<i32>,
    ) -> Result<PriceResult, PricingError> {
        self.calculate_at(product, dealer_id, Utc::now()).await
    }

    /// Price `product` as of `at`
    pub async fn calculate_at(
        &self,
        product: &PricedProduct,
        dealer_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PricingError> {
        self.calculate_in(self.store.as_ref(), product, dealer_id, at).await
    }

    /// Price `product` as of `at`, reading candidate rules from `store`
    pub async fn calculate_in(
        &self,
        store: &dyn CatalogStore,
        product: &PricedProduct,
        dealer_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PricingError> {
        let _timer = self.metrics.start_calculation();

        let candidates = store.candidate_rules(product).await?;
        let result = engine::calculate(product, &candidates, at, dealer_id);

        self.metrics.record_rules_applied(result.applied_rules.len());
        tracing::debug!(
            product_id = product.id,
            candidates = candidates.len(),
            applied = result.applied_rules.len(),
            "Priced product: {} -> {}",
            result.initial,
            result.final_price
        );

        Ok(result)
    }

    /// Look up a product by id and price it as of `at`
    pub async fn price_product(
        &self,
        product_id: i32,
        dealer_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PricingError> {
        self.price_product_in(self.store.as_ref(), product_id, dealer_id, at)
            .await
    }

    /// Same as `price_product`, with every read going through `store`
    pub async fn price_product_in(
        &self,
        store: &dyn CatalogStore,
        product_id: i32,
        dealer_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<PriceResult, PricingError> {
        let product = store
            .find_product(product_id)
            .await?
            .ok_or(PricingError::ProductNotFound(product_id))?;

        self.calculate_in(store, &product, dealer_id, at).await
    }
}
