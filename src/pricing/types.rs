// Domain type definitions for the pricing engine
// Shared by the engine, the rule repository and the admin surface

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Breadth at which a pricing rule applies
///
/// The declaration order doubles as evaluation specificity: at equal priority
/// a Global rule runs before a Category rule, which runs before a Product rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Applies to every product
    Global,

    /// Applies to products that belong to one category
    Category,

    /// Applies to a single product
    Product,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Global => "global",
            RuleScope::Category => "category",
            RuleScope::Product => "product",
        }
    }

    /// Rank used as the second evaluation-order key (lower runs first)
    pub fn specificity(&self) -> u8 {
        match self {
            RuleScope::Global => 0,
            RuleScope::Category => 1,
            RuleScope::Product => 2,
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(RuleScope::Global),
            "category" => Ok(RuleScope::Category),
            "product" => Ok(RuleScope::Product),
            _ => Err(format!("Invalid rule scope: {}", s)),
        }
    }
}

/// How a rule's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Signed percentage-point delta on the running price (10 = +10%, -5 = -5%)
    Percentage,

    /// Signed currency delta added to the running price
    Amount,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Percentage => "percentage",
            RuleType::Amount => "amount",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(RuleType::Percentage),
            "amount" => Ok(RuleType::Amount),
            _ => Err(format!("Invalid rule type: {}", s)),
        }
    }
}

/// Scope of a rule together with the entity it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    Global,
    Category(i32),
    Product(i32),
}

impl RuleTarget {
    /// Build a target from its stored columns.
    ///
    /// Category and Product scopes need a target id; without one the rule can
    /// never match anything and `None` is returned. A Global rule ignores the
    /// target column entirely.
    pub fn from_parts(scope: RuleScope, target: Option<i32>) -> Option<Self> {
        match (scope, target) {
            (RuleScope::Global, _) => Some(RuleTarget::Global),
            (RuleScope::Category, Some(id)) => Some(RuleTarget::Category(id)),
            (RuleScope::Product, Some(id)) => Some(RuleTarget::Product(id)),
            (_, None) => None,
        }
    }

    pub fn scope(&self) -> RuleScope {
        match self {
            RuleTarget::Global => RuleScope::Global,
            RuleTarget::Category(_) => RuleScope::Category,
            RuleTarget::Product(_) => RuleScope::Product,
        }
    }

    pub fn target_id(&self) -> Option<i32> {
        match self {
            RuleTarget::Global => None,
            RuleTarget::Category(id) | RuleTarget::Product(id) => Some(*id),
        }
    }

    /// Whether this target covers the given product
    pub fn matches(&self, product: &PricedProduct) -> bool {
        match self {
            RuleTarget::Global => true,
            RuleTarget::Category(category_id) => product.category_ids.contains(category_id),
            RuleTarget::Product(product_id) => product.id == *product_id,
        }
    }
}

/// The pricing-relevant view of a catalog product
#[derive(Debug, Clone, PartialEq)]
pub struct PricedProduct {
    pub id: i32,
    pub base_price: Decimal,
    /// Manual operator override; replaces `base_price` as the starting price
    pub custom_price: Option<Decimal>,
    pub category_ids: Vec<i32>,
}

impl PricedProduct {
    pub fn starting_price(&self) -> Decimal {
        self.custom_price.unwrap_or(self.base_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn product() -> PricedProduct {
        PricedProduct {
            id: 7,
            base_price: dec!(100.00),
            custom_price: None,
            category_ids: vec![3, 4],
        }
    }

    #[test]
    fn test_rule_scope_display_and_parse() {
        assert_eq!(RuleScope::Global.to_string(), "global");
        assert_eq!(RuleScope::Category.to_string(), "category");
        assert_eq!(RuleScope::Product.to_string(), "product");
        assert_eq!(RuleScope::from_str("category").unwrap(), RuleScope::Category);
        assert!(RuleScope::from_str("dealer").is_err());
    }

    #[test]
    fn test_rule_type_display_and_parse() {
        assert_eq!(RuleType::Percentage.to_string(), "percentage");
        assert_eq!(RuleType::Amount.to_string(), "amount");
        assert_eq!(RuleType::from_str("amount").unwrap(), RuleType::Amount);
        assert!(RuleType::from_str("fixed_amount").is_err());
    }

    #[test]
    fn test_scope_specificity_order() {
        assert!(RuleScope::Global.specificity() < RuleScope::Category.specificity());
        assert!(RuleScope::Category.specificity() < RuleScope::Product.specificity());
        assert!(RuleScope::Global < RuleScope::Product);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serde_json::to_string(&RuleScope::Product).unwrap(), "\"product\"");
        assert_eq!(serde_json::to_string(&RuleType::Percentage).unwrap(), "\"percentage\"");

        let scope: RuleScope = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(scope, RuleScope::Global);
    }

    #[test]
    fn test_target_from_parts() {
        assert_eq!(RuleTarget::from_parts(RuleScope::Global, None), Some(RuleTarget::Global));
        assert_eq!(RuleTarget::from_parts(RuleScope::Global, Some(9)), Some(RuleTarget::Global));
        assert_eq!(RuleTarget::from_parts(RuleScope::Category, Some(3)), Some(RuleTarget::Category(3)));
        assert_eq!(RuleTarget::from_parts(RuleScope::Product, Some(7)), Some(RuleTarget::Product(7)));
        assert_eq!(RuleTarget::from_parts(RuleScope::Category, None), None);
        assert_eq!(RuleTarget::from_parts(RuleScope::Product, None), None);
    }

    #[test]
    fn test_target_matches() {
        let p = product();
        assert!(RuleTarget::Global.matches(&p));
        assert!(RuleTarget::Category(4).matches(&p));
        assert!(!RuleTarget::Category(5).matches(&p));
        assert!(RuleTarget::Product(7).matches(&p));
        assert!(!RuleTarget::Product(8).matches(&p));
    }

    #[test]
    fn test_starting_price_prefers_custom_price() {
        let mut p = product();
        assert_eq!(p.starting_price(), dec!(100.00));

        p.custom_price = Some(dec!(79.90));
        assert_eq!(p.starting_price(), dec!(79.90));
    }
}
