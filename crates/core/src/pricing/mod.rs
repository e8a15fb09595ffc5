pub mod aggregate;
pub mod discount;
pub mod line;
pub mod margin;

use rust_decimal::{Decimal, RoundingStrategy};

pub use aggregate::{
    checked_quote_total, compute_quote_margin, compute_quote_total, price_quote, QuotePricing,
};
pub use discount::{
    compute_effective_discount_percent, compute_final_value, MAX_PERCENT_DISCOUNTS,
};
pub use line::{price_line, LineInputs, LinePricing, RawLineFields};
pub use margin::{
    checked_line_cost, compute_line_cost, compute_margin_percent, MarginEstimate,
    NET_REVENUE_FACTOR,
};

/// Currency amounts and percentages are reported with two decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Half-up rounding to [`MONEY_SCALE`] places.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
