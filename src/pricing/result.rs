// Engine output: the final price plus an ordered audit trail of applied rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pricing::types::{RuleScope, RuleType};

/// One applied rule, recorded in application order
///
/// This is also the element type of an order line's frozen rule snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedRule {
    pub rule_id: i32,
    pub scope: RuleScope,
    pub scope_target: Option<i32>,
    pub rule_type: RuleType,
    #[schema(value_type = String, example = "-5.00")]
    pub value: Decimal,
    pub priority: i32,
    #[schema(value_type = String, example = "110.00")]
    pub price_before: Decimal,
    #[schema(value_type = String, example = "104.50")]
    pub price_after: Decimal,
    #[schema(value_type = String, example = "-5.50")]
    pub difference: Decimal,
}

/// Result of pricing one product at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceResult {
    pub product_id: i32,
    /// Starting price: the custom price when set, the base price otherwise
    #[schema(value_type = String, example = "100.00")]
    pub initial: Decimal,
    #[schema(value_type = String, example = "90.00")]
    pub final_price: Decimal,
    /// `final_price - initial`
    #[schema(value_type = String, example = "-10.00")]
    pub difference: Decimal,
    pub applied_rules: Vec<AppliedRule>,
    pub evaluated_at: DateTime<Utc>,
}

impl PriceResult {
    pub fn new(
        product_id: i32,
        initial: Decimal,
        final_price: Decimal,
        applied_rules: Vec<AppliedRule>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            initial,
            final_price,
            difference: final_price - initial,
            applied_rules,
            evaluated_at,
        }
    }

    pub fn has_adjustments(&self) -> bool {
        !self.applied_rules.is_empty()
    }
}
