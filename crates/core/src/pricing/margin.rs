use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::round_money;

/// Net revenue is estimated as 90% of the sale value (flat 10% taxes and fees).
pub const NET_REVENUE_FACTOR: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

const NOT_AVAILABLE: &str = "N/A";

/// Estimated contribution margin (MC1). Serialized as `"12.34%"` or `"N/A"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarginEstimate {
    Percent(Decimal),
    #[default]
    NotAvailable,
}

impl MarginEstimate {
    pub fn percent(&self) -> Option<Decimal> {
        match self {
            Self::Percent(value) => Some(*value),
            Self::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl fmt::Display for MarginEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{:.2}%", round_money(*value)),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid margin estimate `{0}` (expected `N/A` or a percentage like `12.50%`)")]
pub struct ParseMarginError(String);

impl FromStr for MarginEstimate {
    type Err = ParseMarginError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return Ok(Self::NotAvailable);
        }

        trimmed
            .strip_suffix('%')
            .and_then(|number| Decimal::from_str(number.trim()).ok())
            .map(Self::Percent)
            .ok_or_else(|| ParseMarginError(value.to_string()))
    }
}

impl Serialize for MarginEstimate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MarginEstimate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Total product cost for a line. Unknown unit cost counts as zero.
pub fn compute_line_cost(unit_cost: Option<Decimal>, quantity: u32) -> Decimal {
    checked_line_cost(unit_cost, quantity).unwrap_or(Decimal::MAX)
}

/// [`compute_line_cost`], or `None` when the product does not fit a `Decimal`.
pub fn checked_line_cost(unit_cost: Option<Decimal>, quantity: u32) -> Option<Decimal> {
    match unit_cost {
        Some(cost) => cost.checked_mul(Decimal::from(quantity)),
        None => Some(Decimal::ZERO),
    }
}

/// MC1 estimate: `((cost / (value * 0.9)) - 1) * -1 * 100`.
///
/// `N/A` when the estimated net revenue is not positive, the cost is negative or the ratio is
/// too large to represent.
pub fn compute_margin_percent(line_cost_total: Decimal, final_value: Decimal) -> MarginEstimate {
    let Some(net_revenue) = final_value.checked_mul(NET_REVENUE_FACTOR) else {
        return MarginEstimate::NotAvailable;
    };
    if net_revenue <= Decimal::ZERO || line_cost_total < Decimal::ZERO {
        return MarginEstimate::NotAvailable;
    }

    let margin = line_cost_total
        .checked_div(net_revenue)
        .and_then(|cost_ratio| Decimal::ONE.checked_sub(cost_ratio))
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED));

    match margin {
        Some(margin) => MarginEstimate::Percent(round_money(margin)),
        None => MarginEstimate::NotAvailable,
    }
}
