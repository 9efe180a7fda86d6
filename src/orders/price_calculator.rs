use rust_decimal::Decimal;

use crate::pricing::engine::round_money;

/// Line subtotal from the frozen unit price
///
/// Never consults the price engine: a quantity correction on an existing line
/// reuses `unit_price_snapshot` as stored. Saturates at `Decimal::MAX`.
pub fn line_subtotal(quantity: i32, unit_price_snapshot: Decimal) -> Decimal {
    let subtotal = Decimal::from(quantity)
        .checked_mul(unit_price_snapshot)
        .unwrap_or(Decimal::MAX);
    round_money(subtotal)
}

/// Order total as the sum of its line subtotals, saturating at `Decimal::MAX`
pub fn order_total<'a>(subtotals: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
    subtotals.into_iter().fold(Decimal::ZERO, |total, subtotal| {
        total.checked_add(*subtotal).unwrap_or(Decimal::MAX)
    })
}
