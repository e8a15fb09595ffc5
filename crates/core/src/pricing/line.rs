use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::discount::{
    compute_effective_discount_percent, compute_final_value, MAX_PERCENT_DISCOUNTS,
};
use super::margin::{
    checked_line_cost, compute_line_cost, compute_margin_percent, MarginEstimate,
};
use crate::errors::DomainError;

/// Line fields as they arrive from a form or a store export. `None` means "not provided".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineFields {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: [Option<Decimal>; MAX_PERCENT_DISCOUNTS],
    #[serde(default)]
    pub discount_fixed: Option<Decimal>,
}

/// Validated pricing inputs of one quote line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInputs {
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_percent: [Decimal; MAX_PERCENT_DISCOUNTS],
    #[serde(default)]
    pub discount_fixed: Decimal,
}

fn default_quantity() -> u32 {
    1
}

impl Default for LineInputs {
    fn default() -> Self {
        Self {
            quantity: default_quantity(),
            unit_price: Decimal::ZERO,
            discount_percent: [Decimal::ZERO; MAX_PERCENT_DISCOUNTS],
            discount_fixed: Decimal::ZERO,
        }
    }
}

impl LineInputs {
    /// Normalizes raw fields: quantity below 1 becomes 1, missing or negative amounts become 0.
    /// Percentages outside `0..=100` are rejected.
    pub fn from_raw(raw: &RawLineFields) -> Result<Self, DomainError> {
        Self::default().merge(raw)
    }

    /// Applies `patch` over the current values. Fields the patch leaves out keep their value, and
    /// so do invalid quantities or negative amounts.
    pub fn merge(&self, patch: &RawLineFields) -> Result<Self, DomainError> {
        let merged = self.overlay(patch);
        merged.validate()?;
        Ok(merged)
    }

    /// Same defaulting as [`LineInputs::from_raw`] without the range checks. Stored quotes are
    /// loaded this way and validated later by [`crate::domain::quote::Quote::recompute`].
    pub fn normalized(raw: &RawLineFields) -> Self {
        Self::default().overlay(raw)
    }

    fn overlay(&self, patch: &RawLineFields) -> Self {
        let mut discount_percent = self.discount_percent;
        for (slot, value) in patch.discount_percent.iter().enumerate() {
            if let Some(value) = value {
                discount_percent[slot] = *value;
            }
        }

        Self {
            quantity: patch
                .quantity
                .and_then(|quantity| u32::try_from(quantity).ok())
                .filter(|quantity| *quantity >= 1)
                .unwrap_or(self.quantity),
            unit_price: non_negative_or(patch.unit_price, self.unit_price),
            discount_percent,
            discount_fixed: non_negative_or(patch.discount_fixed, self.discount_fixed),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::InvariantViolation(
                "line quantity must be at least 1".to_string(),
            ));
        }
        if self.unit_price < Decimal::ZERO || self.discount_fixed < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "line amounts must not be negative".to_string(),
            ));
        }

        for (index, value) in self.discount_percent.iter().enumerate() {
            if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
                return Err(DomainError::DiscountOutOfRange { slot: index + 1, value: *value });
            }
        }

        if self.checked_base().is_none() {
            return Err(DomainError::AmountOutOfRange(format!(
                "unit price {} times quantity {}",
                self.unit_price, self.quantity
            )));
        }

        Ok(())
    }

    /// Pre-discount value: `quantity * unit_price`, or `None` when it does not fit a `Decimal`.
    pub fn checked_base(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// [`LineInputs::checked_base`] saturated at `Decimal::MAX`. Validated inputs never saturate.
    pub fn base(&self) -> Decimal {
        self.checked_base().unwrap_or(Decimal::MAX)
    }
}

fn non_negative_or(value: Option<Decimal>, fallback: Decimal) -> Decimal {
    value.filter(|amount| *amount >= Decimal::ZERO).unwrap_or(fallback)
}

/// Derived figures of one quote line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub base: Decimal,
    pub final_value: Decimal,
    pub effective_discount_percent: Decimal,
    pub line_cost_total: Decimal,
    pub margin: MarginEstimate,
}

/// Prices one line. Cost and margin are always computed; whether they are shown is decided by
/// the caller's [`crate::domain::user::CostVisibility`].
///
/// Amounts that do not fit a `Decimal` saturate and leave the margin unavailable.
pub fn price_line(inputs: &LineInputs, unit_cost: Option<Decimal>) -> LinePricing {
    let base = inputs.base();
    let final_value = compute_final_value(base, &inputs.discount_percent, inputs.discount_fixed);
    let line_cost_total = compute_line_cost(unit_cost, inputs.quantity);
    let in_range = inputs.checked_base().is_some()
        && checked_line_cost(unit_cost, inputs.quantity).is_some();
    let margin = match unit_cost {
        Some(_) if in_range => compute_margin_percent(line_cost_total, final_value),
        _ => MarginEstimate::NotAvailable,
    };

    LinePricing {
        base,
        final_value,
        effective_discount_percent: compute_effective_discount_percent(base, final_value),
        line_cost_total,
        margin,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{price_line, LineInputs, RawLineFields};
    use crate::errors::DomainError;
    use crate::pricing::MarginEstimate;

    fn percents(values: [i64; 5]) -> [Decimal; 5] {
        values.map(Decimal::from)
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() -> Result<(), DomainError> {
        let inputs = LineInputs::from_raw(&RawLineFields::default())?;
        assert_eq!(inputs, LineInputs::default());
        assert_eq!(inputs.quantity, 1);
        Ok(())
    }

    #[test]
    fn invalid_quantity_and_negative_amounts_are_defaulted() -> Result<(), DomainError> {
        let inputs = LineInputs::from_raw(&RawLineFields {
            quantity: Some(-3),
            unit_price: Some(Decimal::from(-10)),
            discount_fixed: Some(Decimal::from(-1)),
            ..RawLineFields::default()
        })?;

        assert_eq!(inputs.quantity, 1);
        assert_eq!(inputs.unit_price, Decimal::ZERO);
        assert_eq!(inputs.discount_fixed, Decimal::ZERO);
        Ok(())
    }

    #[test]
    fn merge_keeps_last_valid_values() -> Result<(), DomainError> {
        let current = LineInputs {
            quantity: 4,
            unit_price: Decimal::from(25),
            discount_percent: percents([10, 0, 0, 0, 0]),
            discount_fixed: Decimal::from(2),
        };

        let merged = current.merge(&RawLineFields {
            quantity: Some(0),
            unit_price: Some(Decimal::from(-5)),
            discount_percent: [None, Some(Decimal::from(5)), None, None, None],
            ..RawLineFields::default()
        })?;

        assert_eq!(merged.quantity, 4);
        assert_eq!(merged.unit_price, Decimal::from(25));
        assert_eq!(merged.discount_percent[0], Decimal::from(10));
        assert_eq!(merged.discount_percent[1], Decimal::from(5));
        assert_eq!(merged.discount_fixed, Decimal::from(2));
        Ok(())
    }

    #[test]
    fn out_of_range_percent_is_rejected_with_its_slot() {
        let error = LineInputs::from_raw(&RawLineFields {
            discount_percent: [None, None, Some(Decimal::from(150)), None, None],
            ..RawLineFields::default()
        })
        .expect_err("150% should be rejected");

        assert_eq!(error, DomainError::DiscountOutOfRange { slot: 3, value: Decimal::from(150) });
    }

    #[test]
    fn negative_percent_is_rejected() {
        let result = LineInputs::from_raw(&RawLineFields {
            discount_percent: [Some(Decimal::from(-1)), None, None, None, None],
            ..RawLineFields::default()
        });
        assert!(matches!(result, Err(DomainError::DiscountOutOfRange { slot: 1, .. })));
    }

    #[test]
    fn prices_a_full_line() {
        let inputs = LineInputs {
            quantity: 2,
            unit_price: Decimal::from(50),
            discount_percent: percents([10, 10, 0, 0, 0]),
            discount_fixed: Decimal::from(5),
        };

        let pricing = price_line(&inputs, Some(Decimal::new(2_250, 2)));

        assert_eq!(pricing.base, Decimal::from(100));
        assert_eq!(pricing.final_value, Decimal::from(76));
        assert_eq!(pricing.effective_discount_percent, Decimal::from(24));
        assert_eq!(pricing.line_cost_total, Decimal::from(45));
        // net revenue 68.40, cost 45 -> 34.21%
        assert_eq!(pricing.margin.to_string(), "34.21%");
    }

    #[test]
    fn overflowing_line_value_is_rejected() {
        let inputs = LineInputs { quantity: 10, unit_price: Decimal::MAX, ..LineInputs::default() };

        assert!(matches!(inputs.validate(), Err(DomainError::AmountOutOfRange(_))));
        assert!(inputs.checked_base().is_none());
    }

    #[test]
    fn pricing_an_overflowing_line_does_not_panic() {
        let inputs = LineInputs { quantity: 10, unit_price: Decimal::MAX, ..LineInputs::default() };

        let pricing = price_line(&inputs, Some(Decimal::MAX));

        assert_eq!(pricing.base, Decimal::MAX);
        assert_eq!(pricing.line_cost_total, Decimal::MAX);
        assert_eq!(pricing.margin, MarginEstimate::NotAvailable);
    }

    #[test]
    fn normalizing_keeps_out_of_range_percent_for_later_validation() {
        let inputs = LineInputs::normalized(&RawLineFields {
            quantity: Some(0),
            discount_percent: [Some(Decimal::from(120)), None, None, None, None],
            ..RawLineFields::default()
        });

        assert_eq!(inputs.quantity, 1);
        assert_eq!(inputs.discount_percent[0], Decimal::from(120));
        assert!(matches!(inputs.validate(), Err(DomainError::DiscountOutOfRange { slot: 1, .. })));
    }

    #[test]
    fn unknown_cost_leaves_margin_unavailable() {
        let inputs = LineInputs { unit_price: Decimal::from(10), ..LineInputs::default() };
        let pricing = price_line(&inputs, None);

        assert_eq!(pricing.line_cost_total, Decimal::ZERO);
        assert_eq!(pricing.margin, MarginEstimate::NotAvailable);
    }
}
