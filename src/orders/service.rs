use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::orders::error::OrderError;
use crate::orders::models::{CreateOrderRequest, OrderItemRequest, OrderResponse};
use crate::orders::price_calculator::line_subtotal;
use crate::orders::repository::{NewOrderLine, OrdersRepository};
use crate::orders::snapshot::PriceSnapshot;
use crate::catalog::TransactionCatalog;
use crate::pricing::service::PriceEngine;
use crate::pricing::store::CatalogStore;

/// Price each requested line exactly once at `at`, reading through `store`
///
/// Every line shares the same evaluation instant so a rule window closing
/// mid-checkout cannot split an order across two rule sets.
pub async fn price_lines(
    engine: &PriceEngine,
    store: &dyn CatalogStore,
    items: &[OrderItemRequest],
    dealer_id: Option<i32>,
    at: DateTime<Utc>,
) -> Result<Vec<NewOrderLine>, OrderError> {
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let result = engine
            .price_product_in(store, item.product_id, dealer_id, at)
            .await?;
        let snapshot = PriceSnapshot::from(result);

        lines.push(NewOrderLine {
            product_id: item.product_id,
            quantity: item.quantity,
            subtotal: line_subtotal(item.quantity, snapshot.unit_price),
            snapshot,
        });
    }

    Ok(lines)
}

/// Service for order business logic
#[derive(Clone)]
pub struct OrderService {
    orders: OrdersRepository,
    engine: Arc<PriceEngine>,
}

impl OrderService {
    pub fn new(orders: OrdersRepository, engine: Arc<PriceEngine>) -> Self {
        Self { orders, engine }
    }

    /// Create an order, freezing each line's computed price
    ///
    /// Lines are priced and inserted in one transaction.
    pub async fn create_order(
        &self,
        user_id: i32,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, OrderError> {
        let at = Utc::now();
        let catalog = TransactionCatalog::new(self.orders.begin().await?);
        let lines = price_lines(&self.engine, &catalog, &request.items, request.dealer_id, at).await?;

        let mut tx = catalog.into_inner();
        let (order, items) = self.orders.insert(&mut tx, user_id, &lines).await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} created for user {} with {} lines, total {}",
            order.id,
            user_id,
            items.len(),
            order.total_price
        );
        Ok(OrderResponse::new(order, items))
    }

    /// Fetch an order with its lines; owners and admins only
    pub async fn get_order(
        &self,
        order_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<OrderResponse, OrderError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.user_id != user.user_id && !user.is_admin() {
            tracing::warn!("User {} denied access to order {}", user.user_id, order_id);
            return Err(OrderError::Forbidden(
                "You do not have permission to access this order".to_string(),
            ));
        }

        let items = self.orders.find_items(order.id).await?;
        Ok(OrderResponse::new(order, items))
    }

    /// Correct a line's quantity; the subtotal is recomputed from the frozen
    /// unit price
    pub async fn update_item_quantity(
        &self,
        order_id: Uuid,
        item_id: i32,
        quantity: i32,
    ) -> Result<OrderResponse, OrderError> {
        let item = self
            .orders
            .find_item(order_id, item_id)
            .await?
            .ok_or(OrderError::ItemNotFound)?;

        let subtotal = line_subtotal(quantity, item.unit_price_snapshot);
        let order = self
            .orders
            .update_item_quantity(order_id, item_id, quantity, subtotal)
            .await?;

        tracing::info!(
            "Order {} line {} quantity {} -> {}",
            order_id,
            item_id,
            item.quantity,
            quantity
        );

        let items = self.orders.find_items(order.id).await?;
        Ok(OrderResponse::new(order, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rule::PriceRule;
    use crate::pricing::store::in_memory::InMemoryCatalog;
    use crate::pricing::types::{PricedProduct, RuleTarget, RuleType};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn rule(id: i32, target: RuleTarget, rule_type: RuleType, value: Decimal, priority: i32) -> PriceRule {
        PriceRule {
            id,
            target,
            rule_type,
            value,
            priority,
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(
            vec![
                PricedProduct {
                    id: 1,
                    base_price: dec!(100.00),
                    custom_price: None,
                    category_ids: vec![],
                },
                PricedProduct {
                    id: 2,
                    base_price: dec!(40.00),
                    custom_price: Some(dec!(35.00)),
                    category_ids: vec![6],
                },
            ],
            vec![
                rule(1, RuleTarget::Global, RuleType::Percentage, dec!(10), 1),
                rule(2, RuleTarget::Product(1), RuleType::Amount, dec!(-20), 2),
            ],
        ))
    }

    fn engine(catalog: &Arc<InMemoryCatalog>) -> PriceEngine {
        PriceEngine::new(catalog.clone())
    }

    fn item(product_id: i32, quantity: i32) -> OrderItemRequest {
        OrderItemRequest { product_id, quantity }
    }

    #[tokio::test]
    async fn test_lines_freeze_engine_output() {
        let catalog = catalog();
        let engine = engine(&catalog);

        let lines = price_lines(&engine, catalog.as_ref(), &[item(1, 2), item(2, 1)], None, at())
            .await
            .unwrap();

        assert_eq!(lines.len(), 2);
        // 100 +10% = 110, -20 = 90
        assert_eq!(lines[0].snapshot.unit_price, dec!(90.00));
        assert_eq!(lines[0].snapshot.applied_rules.len(), 2);
        assert_eq!(lines[0].subtotal, dec!(180.00));
        // custom 35 +10% = 38.50
        assert_eq!(lines[1].snapshot.unit_price, dec!(38.50));
        assert_eq!(lines[1].subtotal, dec!(38.50));
    }

    #[tokio::test]
    async fn test_each_line_priced_once() {
        let catalog = catalog();
        let engine = engine(&catalog);

        price_lines(&engine, catalog.as_ref(), &[item(1, 1), item(2, 3), item(1, 5)], Some(9), at())
            .await
            .unwrap();

        assert_eq!(engine.metrics().summary().calculations, 3);
    }

    #[tokio::test]
    async fn test_unknown_product_fails_whole_order() {
        let catalog = catalog();
        let engine = engine(&catalog);

        let err = price_lines(&engine, catalog.as_ref(), &[item(1, 1), item(77, 1)], None, at())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ProductNotFound(77)));
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_rule_changes() {
        let catalog = Arc::new(InMemoryCatalog::new(
            vec![PricedProduct {
                id: 1,
                base_price: dec!(60.00),
                custom_price: None,
                category_ids: vec![],
            }],
            vec![],
        ));
        let engine = PriceEngine::new(catalog.clone());

        let lines = price_lines(&engine, catalog.as_ref(), &[item(1, 1)], None, at())
            .await
            .unwrap();
        catalog.push_rule(rule(5, RuleTarget::Global, RuleType::Amount, dec!(-10), 1));
        let repriced = engine
            .price_product(1, None, at() + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(lines[0].snapshot.unit_price, dec!(60.00));
        assert_eq!(repriced.final_price, dec!(50.00));
    }

    #[tokio::test]
    async fn test_lines_read_through_given_store() {
        let engine = PriceEngine::new(Arc::new(InMemoryCatalog::default()));
        let catalog = catalog();

        let lines = price_lines(&engine, catalog.as_ref(), &[item(2, 2)], None, at())
            .await
            .unwrap();

        assert_eq!(lines[0].snapshot.unit_price, dec!(38.50));
        assert_eq!(lines[0].subtotal, dec!(77.00));
    }
}
