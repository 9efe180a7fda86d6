// Price calculation
//
// Pure functions only: the caller supplies the product, the candidate rules and
// the evaluation instant. Loading rules lives in `PriceEngine` (service.rs).

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

use crate::pricing::result::{AppliedRule, PriceResult};
use crate::pricing::rule::PriceRule;
use crate::pricing::types::{PricedProduct, RuleType};

/// Money precision used after every rule application
pub const MONEY_DP: u32 = 2;

/// Round half-up to cents
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Total evaluation order: priority, then scope specificity, then rule id
pub fn evaluation_order(a: &PriceRule, b: &PriceRule) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.scope().specificity().cmp(&b.scope().specificity()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rules from `candidates` that apply to `product` at `at`, in evaluation order
pub fn applicable_rules<'a>(
    product: &PricedProduct,
    candidates: &'a [PriceRule],
    at: DateTime<Utc>,
) -> Vec<&'a PriceRule> {
    let mut rules: Vec<&PriceRule> = candidates
        .iter()
        .filter(|rule| rule.applies_to(product) && rule.is_applicable_at(at))
        .collect();

    rules.sort_by(|a, b| evaluation_order(a, b));
    // a rule reachable through two lookups must still apply once
    rules.dedup_by_key(|rule| rule.id);
    rules
}

/// Decimal bound reached by an overflowing step
fn saturated(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Apply one rule to the running price.
///
/// The adjusted price is clamped at zero and then rounded to cents. A step
/// that overflows `Decimal` saturates at its bound before the clamp.
pub fn apply_rule(price_before: Decimal, rule: &PriceRule) -> AppliedRule {
    let adjusted = match rule.rule_type {
        RuleType::Percentage => {
            let factor = Decimal::ONE + rule.value / Decimal::ONE_HUNDRED;
            price_before.checked_mul(factor).unwrap_or_else(|| {
                saturated(price_before.is_sign_negative() != factor.is_sign_negative())
            })
        }
        RuleType::Amount => price_before
            .checked_add(rule.value)
            .unwrap_or_else(|| saturated(rule.value.is_sign_negative())),
    };
    let price_after = round_money(adjusted.max(Decimal::ZERO));

    AppliedRule {
        rule_id: rule.id,
        scope: rule.scope(),
        scope_target: rule.target.target_id(),
        rule_type: rule.rule_type,
        value: rule.value,
        priority: rule.priority,
        price_before,
        price_after,
        difference: price_after - price_before,
    }
}

/// Calculate the sale price of `product` at `at`.
///
/// `candidates` may contain rules for other products or scopes; anything that
/// does not match, is inactive, or is outside its validity window is ignored
/// and never appears in the audit trail. `dealer_id` is accepted for dealer-tier
/// pricing and currently has no effect.
pub fn calculate(
    product: &PricedProduct,
    candidates: &[PriceRule],
    at: DateTime<Utc>,
    dealer_id: Option<i32>,
) -> PriceResult {
    if let Some(dealer_id) = dealer_id {
        tracing::trace!(product_id = product.id, dealer_id, "dealer id ignored by current rule types");
    }

    let initial = product.starting_price();
    let rules = applicable_rules(product, candidates, at);

    let (final_price, applied_rules) = rules.into_iter().fold(
        (initial, Vec::new()),
        |(running_price, mut trail), rule| {
            let step = apply_rule(running_price, rule);
            tracing::debug!(
                product_id = product.id,
                rule_id = step.rule_id,
                scope = %step.scope,
                rule_type = %step.rule_type,
                "Applied price rule: {} -> {}",
                step.price_before,
                step.price_after
            );
            let next_price = step.price_after;
            trail.push(step);
            (next_price, trail)
        },
    );

    PriceResult::new(product.id, initial, final_price, applied_rules, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::types::RuleTarget;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 30, 0).unwrap()
    }

    fn product(base_price: Decimal) -> PricedProduct {
        PricedProduct {
            id: 42,
            base_price,
            custom_price: None,
            category_ids: vec![5],
        }
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
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_no_rules_is_identity() {
        let result = calculate(&product(dec!(100.00)), &[], now(), None);
        assert_eq!(result.initial, dec!(100.00));
        assert_eq!(result.final_price, dec!(100.00));
        assert_eq!(result.difference, Decimal::ZERO);
        assert!(result.applied_rules.is_empty());
    }

    #[test]
    fn test_custom_price_replaces_base_price() {
        let mut p = product(dec!(100.00));
        p.custom_price = Some(dec!(80.00));
        let rules = vec![rule(1, RuleTarget::Global, RuleType::Percentage, dec!(10), 1)];

        let result = calculate(&p, &rules, now(), None);
        assert_eq!(result.initial, dec!(80.00));
        assert_eq!(result.final_price, dec!(88.00));
    }

    #[test]
    fn test_global_then_product_scenario() {
        let rules = vec![
            rule(2, RuleTarget::Product(42), RuleType::Amount, dec!(-20), 2),
            rule(1, RuleTarget::Global, RuleType::Percentage, dec!(10), 1),
        ];

        let result = calculate(&product(dec!(100.00)), &rules, now(), None);
        assert_eq!(result.initial, dec!(100.00));
        assert_eq!(result.final_price, dec!(90.00));
        assert_eq!(result.applied_rules.len(), 2);
        assert_eq!(result.applied_rules[0].price_after, dec!(110.00));
        assert_eq!(result.applied_rules[1].price_before, dec!(110.00));
        assert_eq!(result.applied_rules[1].difference, dec!(-20.00));
    }

    #[test]
    fn test_clamp_to_zero() {
        let rules = vec![rule(1, RuleTarget::Global, RuleType::Amount, dec!(-50), 1)];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        assert_eq!(result.final_price, dec!(0.00));
        assert_eq!(result.applied_rules[0].price_after, Decimal::ZERO);
        assert_eq!(result.applied_rules[0].difference, dec!(-10.00));
    }

    #[test]
    fn test_clamp_happens_per_step() {
        // -50 clamps to 0 before the +5 amount, so the result is 5 rather than 0
        let rules = vec![
            rule(1, RuleTarget::Global, RuleType::Amount, dec!(-50), 1),
            rule(2, RuleTarget::Global, RuleType::Amount, dec!(5), 2),
        ];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        assert_eq!(result.final_price, dec!(5.00));
    }

    #[test]
    fn test_compounding_overflow_saturates() {
        let rules: Vec<PriceRule> = (1..=4)
            .map(|id| rule(id, RuleTarget::Global, RuleType::Percentage, dec!(99999999.9999), id))
            .collect();

        let result = calculate(&product(dec!(9999999999.99)), &rules, now(), None);
        assert_eq!(result.applied_rules.len(), 4);
        assert_eq!(result.final_price, Decimal::MAX);
        assert!(result.applied_rules[2].price_after < Decimal::MAX);
    }

    #[test]
    fn test_amount_overflow_saturates() {
        let rules = vec![
            rule(1, RuleTarget::Global, RuleType::Amount, Decimal::MAX, 1),
            rule(2, RuleTarget::Global, RuleType::Amount, dec!(1), 2),
        ];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        assert_eq!(result.final_price, Decimal::MAX);
        assert_eq!(result.applied_rules[1].difference, Decimal::ZERO);
    }

    #[test]
    fn test_negative_overflow_clamps_to_zero() {
        let huge = rule(1, RuleTarget::Global, RuleType::Amount, Decimal::MAX, 1);
        let cut = rule(2, RuleTarget::Global, RuleType::Percentage, dec!(-99999999.9999), 2);

        let result = calculate(&product(dec!(10.00)), &[huge, cut], now(), None);
        assert_eq!(result.final_price, Decimal::ZERO);
    }

    #[test]
    fn test_inactive_rule_ignored() {
        let mut inactive = rule(1, RuleTarget::Global, RuleType::Percentage, dec!(20), 1);
        inactive.is_active = false;

        let result = calculate(&product(dec!(50.00)), &[inactive], now(), None);
        assert_eq!(result.final_price, dec!(50.00));
        assert!(result.applied_rules.is_empty());
    }

    #[test]
    fn test_time_window_exclusion() {
        let mut expired = rule(1, RuleTarget::Global, RuleType::Amount, dec!(-1), 1);
        expired.ends_at = Some(now() - Duration::minutes(1));
        let mut pending = rule(2, RuleTarget::Global, RuleType::Amount, dec!(-2), 1);
        pending.starts_at = Some(now() + Duration::minutes(1));
        let open = rule(3, RuleTarget::Global, RuleType::Amount, dec!(-3), 1);

        let result = calculate(&product(dec!(100.00)), &[expired, pending, open], now(), None);
        let ids: Vec<i32> = result.applied_rules.iter().map(|r| r.rule_id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(result.final_price, dec!(97.00));
    }

    #[test]
    fn test_window_reevaluated_at_given_instant() {
        let mut weekend = rule(1, RuleTarget::Global, RuleType::Percentage, dec!(-10), 1);
        weekend.starts_at = Some(now() + Duration::days(1));
        weekend.ends_at = Some(now() + Duration::days(3));
        let rules = vec![weekend];

        let today = calculate(&product(dec!(100.00)), &rules, now(), None);
        let saturday = calculate(&product(dec!(100.00)), &rules, now() + Duration::days(2), None);
        assert_eq!(today.final_price, dec!(100.00));
        assert_eq!(saturday.final_price, dec!(90.00));
    }

    #[test]
    fn test_rounding_after_each_step() {
        let rules = vec![rule(1, RuleTarget::Global, RuleType::Percentage, dec!(33.33), 1)];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        assert_eq!(result.applied_rules[0].price_after, dec!(13.33));
        assert_eq!(result.final_price, dec!(13.33));
    }

    #[test]
    fn test_rounding_is_half_up() {
        // 0.05 * 1.5 = 0.075 -> 0.08
        assert_eq!(round_money(dec!(0.075)), dec!(0.08));
        assert_eq!(round_money(dec!(0.074)), dec!(0.07));
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
    }

    #[test]
    fn test_percentages_compound_on_running_price() {
        let rules = vec![
            rule(1, RuleTarget::Global, RuleType::Percentage, dec!(-10), 1),
            rule(2, RuleTarget::Global, RuleType::Percentage, dec!(-10), 2),
        ];

        let result = calculate(&product(dec!(100.00)), &rules, now(), None);
        assert_eq!(result.final_price, dec!(81.00));
    }

    #[test]
    fn test_priority_beats_scope_and_creation_order() {
        let rules = vec![
            rule(1, RuleTarget::Global, RuleType::Amount, dec!(1), 2),
            rule(9, RuleTarget::Product(42), RuleType::Amount, dec!(1), 1),
        ];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        let ids: Vec<i32> = result.applied_rules.iter().map(|r| r.rule_id).collect();
        assert_eq!(ids, vec![9, 1]);
    }

    #[test]
    fn test_scope_tie_break_at_equal_priority() {
        let rules = vec![
            rule(1, RuleTarget::Category(5), RuleType::Percentage, dec!(-10), 1),
            rule(2, RuleTarget::Global, RuleType::Amount, dec!(10), 1),
        ];

        let result = calculate(&product(dec!(100.00)), &rules, now(), None);
        let global = &result.applied_rules[0];
        let category = &result.applied_rules[1];
        assert_eq!(global.rule_id, 2);
        assert_eq!(category.price_before, global.price_after);
        assert_eq!(result.final_price, dec!(99.00));
    }

    #[test]
    fn test_rule_id_breaks_remaining_ties() {
        let rules = vec![
            rule(8, RuleTarget::Global, RuleType::Amount, dec!(1), 1),
            rule(3, RuleTarget::Global, RuleType::Amount, dec!(1), 1),
        ];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        let ids: Vec<i32> = result.applied_rules.iter().map(|r| r.rule_id).collect();
        assert_eq!(ids, vec![3, 8]);
    }

    #[test]
    fn test_rules_for_other_targets_are_skipped() {
        let rules = vec![
            rule(1, RuleTarget::Category(99), RuleType::Amount, dec!(-5), 1),
            rule(2, RuleTarget::Product(7), RuleType::Amount, dec!(-5), 1),
        ];

        let result = calculate(&product(dec!(10.00)), &rules, now(), None);
        assert!(result.applied_rules.is_empty());
    }

    #[test]
    fn test_duplicate_candidates_apply_once() {
        let r = rule(1, RuleTarget::Global, RuleType::Amount, dec!(-1), 1);

        let result = calculate(&product(dec!(10.00)), &[r.clone(), r], now(), None);
        assert_eq!(result.applied_rules.len(), 1);
        assert_eq!(result.final_price, dec!(9.00));
    }

    #[test]
    fn test_dealer_id_is_inert() {
        let rules = vec![rule(1, RuleTarget::Global, RuleType::Percentage, dec!(5), 1)];

        let without = calculate(&product(dec!(20.00)), &rules, now(), None);
        let with = calculate(&product(dec!(20.00)), &rules, now(), Some(77));
        assert_eq!(without, with);
    }
}
