// Postgres-backed catalog reads
//
// Serves the storefront product views and implements `CatalogStore` for the
// price engine, over the pool or over an open transaction. Nothing here writes
// to the catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::catalog::models::{Product, ProductRow};
use crate::pricing::error::PricingError;
use crate::pricing::repository::RULE_COLUMNS;
use crate::pricing::rule::{decode_rules, PriceRule, PriceRuleRow};
use crate::pricing::store::CatalogStore;
use crate::pricing::types::{PricedProduct, RuleTarget};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, base_price, custom_price, is_active, created_at, updated_at";

async fn load_category_ids(
    conn: &mut PgConnection,
    product_ids: &[i32],
) -> Result<HashMap<i32, Vec<i32>>, PricingError> {
    let pairs: Vec<(i32, i32)> = sqlx::query_as(
        r#"
        SELECT product_id, category_id
        FROM product_categories
        WHERE product_id = ANY($1)
        ORDER BY product_id, category_id
        "#,
    )
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut memberships: HashMap<i32, Vec<i32>> = HashMap::new();
    for (product_id, category_id) in pairs {
        memberships.entry(product_id).or_default().push(category_id);
    }
    Ok(memberships)
}

/// Product by id regardless of its active flag
async fn load_product(conn: &mut PgConnection, id: i32) -> Result<Option<Product>, PricingError> {
    let Some(row) = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let category_ids = load_category_ids(conn, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    Ok(Some(Product { row, category_ids }))
}

async fn load_candidate_rules(
    conn: &mut PgConnection,
    product: &PricedProduct,
) -> Result<Vec<PriceRule>, PricingError> {
    let rows = sqlx::query_as::<_, PriceRuleRow>(&format!(
        r#"
        SELECT {RULE_COLUMNS}
        FROM price_rules
        WHERE scope = 'global'
           OR (scope = 'category' AND scope_target = ANY($1))
           OR (scope = 'product' AND scope_target = $2)
        "#
    ))
    .bind(&product.category_ids)
    .bind(product.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(decode_rules(rows))
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active products with their category memberships, ordered by id
    pub async fn list_active_products(&self) -> Result<Vec<Product>, PricingError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active ORDER BY id"
        ))
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut memberships = load_category_ids(&mut conn, &ids).await?;

        tracing::debug!("Loaded {} active products", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| Product {
                category_ids: memberships.remove(&row.id).unwrap_or_default(),
                row,
            })
            .collect())
    }

    /// Product by id regardless of its active flag
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Product>, PricingError> {
        let mut conn = self.pool.acquire().await?;
        load_product(&mut conn, id).await
    }

    /// Whether the category or product a rule points at exists
    pub async fn target_exists(&self, target: RuleTarget) -> Result<bool, PricingError> {
        let sql = match target {
            RuleTarget::Global => return Ok(true),
            RuleTarget::Category(_) => "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
            RuleTarget::Product(_) => "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        };

        let exists: Option<bool> = sqlx::query_scalar(sql)
            .bind(target.target_id())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.unwrap_or(false))
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn find_product(&self, product_id: i32) -> Result<Option<PricedProduct>, PricingError> {
        Ok(self.find_by_id(product_id).await?.map(|product| product.priced()))
    }

    async fn candidate_rules(&self, product: &PricedProduct) -> Result<Vec<PriceRule>, PricingError> {
        let mut conn = self.pool.acquire().await?;
        load_candidate_rules(&mut conn, product).await
    }
}

/// Catalog reads bound to an open transaction
///
/// Order creation prices its lines through this store so the reads and the
/// line inserts commit or roll back together.
pub struct TransactionCatalog {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl TransactionCatalog {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx: Mutex::new(tx) }
    }

    pub fn into_inner(self) -> Transaction<'static, Postgres> {
        self.tx.into_inner()
    }
}

#[async_trait]
impl CatalogStore for TransactionCatalog {
    async fn find_product(&self, product_id: i32) -> Result<Option<PricedProduct>, PricingError> {
        let mut tx = self.tx.lock().await;
        Ok(load_product(&mut **tx, product_id).await?.map(|product| product.priced()))
    }

    async fn candidate_rules(&self, product: &PricedProduct) -> Result<Vec<PriceRule>, PricingError> {
        let mut tx = self.tx.lock().await;
        load_candidate_rules(&mut **tx, product).await
    }
}
