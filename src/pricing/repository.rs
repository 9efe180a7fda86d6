// Price rule persistence for the administration surface
//
// Rules are never deleted; retiring a rule flips `is_active`. Rows are returned
// as stored so an inert rule can still be read and retired.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::pricing::error::PricingError;
use crate::pricing::rule::PriceRuleRow;
use crate::pricing::types::{RuleScope, RuleTarget, RuleType};

pub(crate) const RULE_COLUMNS: &str = "id, scope, scope_target, rule_type, value, priority, is_active, \
                            starts_at, ends_at, created_at, updated_at";

/// Validated rule fields for insert and full update
#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceRule {
    pub target: RuleTarget,
    pub rule_type: RuleType,
    pub value: Decimal,
    pub priority: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Optional filters for listing rules
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub scope: Option<RuleScope>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct PriceRuleRepository {
    pool: PgPool,
}

impl PriceRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, rule: &NewPriceRule) -> Result<PriceRuleRow, PricingError> {
        let row = sqlx::query_as::<_, PriceRuleRow>(&format!(
            r#"
            INSERT INTO price_rules (scope, scope_target, rule_type, value, priority, is_active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule.target.scope().as_str())
        .bind(rule.target.target_id())
        .bind(rule.rule_type.as_str())
        .bind(rule.value)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.starts_at)
        .bind(rule.ends_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<PriceRuleRow>, PricingError> {
        let row = sqlx::query_as::<_, PriceRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM price_rules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// List rules in evaluation order (priority, then id)
    pub async fn list(&self, filter: &RuleFilter) -> Result<Vec<PriceRuleRow>, PricingError> {
        let rows = sqlx::query_as::<_, PriceRuleRow>(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM price_rules
            WHERE ($1::text IS NULL OR scope = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY priority, id
            "#
        ))
        .bind(filter.scope.map(|scope| scope.as_str()))
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update(&self, id: i32, rule: &NewPriceRule) -> Result<Option<PriceRuleRow>, PricingError> {
        let row = sqlx::query_as::<_, PriceRuleRow>(&format!(
            r#"
            UPDATE price_rules
            SET scope = $1,
                scope_target = $2,
                rule_type = $3,
                value = $4,
                priority = $5,
                is_active = $6,
                starts_at = $7,
                ends_at = $8,
                updated_at = NOW()
            WHERE id = $9
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule.target.scope().as_str())
        .bind(rule.target.target_id())
        .bind(rule.rule_type.as_str())
        .bind(rule.value)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.starts_at)
        .bind(rule.ends_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<Option<PriceRuleRow>, PricingError> {
        let row = sqlx::query_as::<_, PriceRuleRow>(&format!(
            r#"
            UPDATE price_rules
            SET is_active = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
