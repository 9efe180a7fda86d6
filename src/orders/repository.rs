use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::orders::error::OrderError;
use crate::orders::models::{Order, OrderItem, OrderStatus};
use crate::orders::price_calculator::order_total;
use crate::orders::snapshot::PriceSnapshot;

const ORDER_COLUMNS: &str = "id, user_id, status, total_price, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price_snapshot, \
                            price_rules_snapshot, subtotal, created_at";

/// A priced order line ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub product_id: i32,
    pub quantity: i32,
    pub snapshot: PriceSnapshot,
    pub subtotal: Decimal,
}

/// Repository for orders and their lines
///
/// Exposes no statement that writes `unit_price_snapshot` or
/// `price_rules_snapshot` after insert.
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the transaction an order is priced and inserted in
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, OrderError> {
        Ok(self.pool.begin().await?)
    }

    /// Insert the order and all its lines on `conn`; the caller commits
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        lines: &[NewOrderLine],
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        let total_price = order_total(lines.iter().map(|line| &line.subtotal));

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, status, total_price)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(OrderStatus::Pending)
        .bind(total_price)
        .fetch_one(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_snapshot, price_rules_snapshot, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.snapshot.unit_price)
            .bind(Json(&line.snapshot.applied_rules))
            .bind(line.subtotal)
            .fetch_one(&mut *conn)
            .await?;
            items.push(item);
        }

        Ok((order, items))
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn find_item(&self, order_id: Uuid, item_id: i32) -> Result<Option<OrderItem>, OrderError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 AND id = $2"
        ))
        .bind(order_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Change a line's quantity and subtotal, then re-sum the order total
    pub async fn update_item_quantity(
        &self,
        order_id: Uuid,
        item_id: i32,
        quantity: i32,
        subtotal: Decimal,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE order_items
            SET quantity = $1, subtotal = $2
            WHERE order_id = $3 AND id = $4
            "#,
        )
        .bind(quantity)
        .bind(subtotal)
        .bind(order_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(OrderError::ItemNotFound);
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET total_price = (SELECT COALESCE(SUM(subtotal), 0) FROM order_items WHERE order_id = $1),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }
}
