// Price rule records
//
// `PriceRuleRow` mirrors the price_rules table; `PriceRule` is the decoded,
// type-safe form the engine evaluates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::pricing::error::PricingError;
use crate::pricing::types::{PricedProduct, RuleScope, RuleTarget, RuleType};

/// Raw price rule row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct PriceRuleRow {
    pub id: i32,
    pub scope: String,
    pub scope_target: Option<i32>,
    pub rule_type: String,
    pub value: Decimal,
    pub priority: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A decoded pricing rule
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRule {
    pub id: i32,
    pub target: RuleTarget,
    pub rule_type: RuleType,
    pub value: Decimal,
    pub priority: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceRule {
    pub fn scope(&self) -> RuleScope {
        self.target.scope()
    }

    /// Active and inside the inclusive `[starts_at, ends_at]` window at `at`
    pub fn is_applicable_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.map_or(true, |starts_at| starts_at <= at)
            && self.ends_at.map_or(true, |ends_at| ends_at >= at)
    }

    pub fn applies_to(&self, product: &PricedProduct) -> bool {
        self.target.matches(product)
    }
}

impl TryFrom<PriceRuleRow> for PriceRule {
    type Error = PricingError;

    fn try_from(row: PriceRuleRow) -> Result<Self, Self::Error> {
        let malformed = |reason: String| PricingError::MalformedRule {
            rule_id: row.id,
            reason,
        };

        let scope: RuleScope = row.scope.parse().map_err(malformed)?;
        let rule_type: RuleType = row.rule_type.parse().map_err(malformed)?;
        let target = RuleTarget::from_parts(scope, row.scope_target)
            .ok_or_else(|| malformed(format!("{} scope requires a target", scope)))?;

        Ok(PriceRule {
            id: row.id,
            target,
            rule_type,
            value: row.value,
            priority: row.priority,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Decode rows, dropping the ones that can never match a product
pub fn decode_rules(rows: Vec<PriceRuleRow>) -> Vec<PriceRule> {
    rows.into_iter()
        .filter_map(|row| match PriceRule::try_from(row) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::debug!("Skipping inert price rule: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn row(scope: &str, scope_target: Option<i32>) -> PriceRuleRow {
        PriceRuleRow {
            id: 11,
            scope: scope.to_string(),
            scope_target,
            rule_type: "percentage".to_string(),
            value: dec!(10),
            priority: 1,
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn rule() -> PriceRule {
        PriceRule::try_from(row("global", None)).unwrap()
    }

    #[test]
    fn test_row_decodes_into_rule() {
        let rule = PriceRule::try_from(row("category", Some(4))).unwrap();
        assert_eq!(rule.target, RuleTarget::Category(4));
        assert_eq!(rule.rule_type, RuleType::Percentage);
        assert_eq!(rule.scope(), RuleScope::Category);
    }

    #[test]
    fn test_row_without_target_is_malformed() {
        let err = PriceRule::try_from(row("product", None)).unwrap_err();
        assert!(matches!(err, PricingError::MalformedRule { rule_id: 11, .. }));
    }

    #[test]
    fn test_row_with_unknown_scope_is_malformed() {
        assert!(PriceRule::try_from(row("dealer", Some(1))).is_err());
    }

    #[test]
    fn test_decode_rules_drops_inert_rows() {
        let rules = decode_rules(vec![
            row("global", None),
            row("category", None),
            row("product", Some(3)),
        ]);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_open_window_is_applicable() {
        assert!(rule().is_applicable_at(at()));
    }

    #[test]
    fn test_inactive_rule_is_never_applicable() {
        let mut r = rule();
        r.is_active = false;
        assert!(!r.is_applicable_at(at()));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut r = rule();
        r.starts_at = Some(at());
        r.ends_at = Some(at());
        assert!(r.is_applicable_at(at()));
        assert!(!r.is_applicable_at(at() + Duration::seconds(1)));
        assert!(!r.is_applicable_at(at() - Duration::seconds(1)));
    }

    #[test]
    fn test_expired_and_future_rules() {
        let mut expired = rule();
        expired.ends_at = Some(at() - Duration::days(1));
        assert!(!expired.is_applicable_at(at()));

        let mut future = rule();
        future.starts_at = Some(at() + Duration::days(1));
        assert!(!future.is_applicable_at(at()));
    }
}
