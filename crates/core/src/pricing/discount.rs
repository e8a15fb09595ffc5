use rust_decimal::Decimal;

use super::round_money;

/// A line carries at most this many cascading percentage discounts.
pub const MAX_PERCENT_DISCOUNTS: usize = 5;

/// Applies each positive percentage to the progressively reduced value, then subtracts the
/// fixed discount and floors the result at zero.
///
/// Percentages are not range-checked here; [`super::LineInputs`] rejects values outside
/// `0..=100` before they reach this function.
pub fn compute_final_value(
    base: Decimal,
    percent_discounts: &[Decimal],
    fixed_discount: Decimal,
) -> Decimal {
    let after_percent = percent_discounts
        .iter()
        .filter(|discount| **discount > Decimal::ZERO)
        .fold(base, |value, discount| {
            value.saturating_mul(Decimal::ONE - *discount / Decimal::ONE_HUNDRED)
        });

    round_money(after_percent.saturating_sub(fixed_discount).max(Decimal::ZERO))
}

/// Share of `base` removed by all discounts, as a percentage. Zero when `base` is not positive.
pub fn compute_effective_discount_percent(base: Decimal, final_value: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    base.saturating_sub(final_value)
        .checked_div(base)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .map(round_money)
        .unwrap_or(Decimal::ZERO)
}
