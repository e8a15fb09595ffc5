use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::margin::{compute_margin_percent, MarginEstimate};
use crate::domain::quote::QuoteLine;

/// Quote-level figures, always recomputed from the full line list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePricing {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub cost_total: Decimal,
    pub margin: MarginEstimate,
}

/// Sum of the line final values, saturated at `Decimal::MAX`.
pub fn compute_quote_total(lines: &[QuoteLine]) -> Decimal {
    saturating_sum(lines.iter().map(|line| line.final_value))
}

/// Sum of the line final values, or `None` when it does not fit a `Decimal`.
pub fn checked_quote_total(lines: &[QuoteLine]) -> Option<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| total.checked_add(line.final_value))
}

/// Same estimate as a single line, using the summed line costs against the quote total.
pub fn compute_quote_margin(lines: &[QuoteLine], quote_total: Decimal) -> MarginEstimate {
    let cost_total =
        lines.iter().try_fold(Decimal::ZERO, |total, line| total.checked_add(line.line_cost_total));
    match cost_total {
        Some(cost_total) => compute_margin_percent(cost_total, quote_total),
        None => MarginEstimate::NotAvailable,
    }
}

pub fn price_quote(lines: &[QuoteLine]) -> QuotePricing {
    let subtotal = saturating_sum(lines.iter().map(|line| line.inputs.base()));
    let total = compute_quote_total(lines);
    let cost_total = saturating_sum(lines.iter().map(|line| line.line_cost_total));

    QuotePricing {
        subtotal,
        discount_total: subtotal.saturating_sub(total),
        total,
        cost_total,
        margin: compute_quote_margin(lines, total),
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{checked_quote_total, compute_quote_margin, compute_quote_total, price_quote};
    use crate::domain::product::ProductId;
    use crate::domain::quote::QuoteLine;
    use crate::pricing::{LineInputs, MarginEstimate};

    fn line(unit_price: i64, quantity: u32, unit_cost: Option<i64>) -> QuoteLine {
        let mut line = QuoteLine::new(
            ProductId("prod-1".to_string()),
            "Painel".to_string(),
            LineInputs { quantity, unit_price: Decimal::from(unit_price), ..LineInputs::default() },
            unit_cost.map(Decimal::from),
        );
        line.reprice();
        line
    }

    #[test]
    fn total_sums_final_values() {
        let lines = vec![line(76, 1, None), line(24, 1, None)];
        assert_eq!(compute_quote_total(&lines), Decimal::from(100));
    }

    #[test]
    fn empty_quote_has_zero_total_and_no_margin() {
        assert_eq!(compute_quote_total(&[]), Decimal::ZERO);
        assert_eq!(compute_quote_margin(&[], Decimal::ZERO), MarginEstimate::NotAvailable);
    }

    #[test]
    fn quote_margin_uses_summed_costs() {
        let lines = vec![line(50, 1, Some(20)), line(25, 2, Some(12)), line(10, 1, None)];
        let total = compute_quote_total(&lines);

        // total 110, net revenue 99, cost 44 -> 55.56%
        assert_eq!(total, Decimal::from(110));
        assert_eq!(compute_quote_margin(&lines, total).to_string(), "55.56%");
    }

    #[test]
    fn summary_reports_discount_against_subtotal() {
        let mut discounted = line(100, 1, Some(45));
        discounted.inputs.discount_percent[0] = Decimal::from(10);
        discounted.inputs.discount_percent[1] = Decimal::from(10);
        discounted.inputs.discount_fixed = Decimal::from(5);
        discounted.reprice();

        let summary = price_quote(&[discounted, line(24, 1, None)]);

        assert_eq!(summary.subtotal, Decimal::from(124));
        assert_eq!(summary.total, Decimal::from(100));
        assert_eq!(summary.discount_total, Decimal::from(24));
        assert_eq!(summary.cost_total, Decimal::from(45));
        assert_eq!(summary.margin.to_string(), "50.00%");
    }

    #[test]
    fn overflowing_total_is_detected_and_saturated() {
        let mut first = line(1, 1, Some(1));
        first.final_value = Decimal::MAX;
        first.line_cost_total = Decimal::MAX;
        let lines = vec![first.clone(), first];

        assert_eq!(checked_quote_total(&lines), None);
        assert_eq!(compute_quote_total(&lines), Decimal::MAX);
        assert_eq!(compute_quote_margin(&lines, Decimal::MAX), MarginEstimate::NotAvailable);
        assert_eq!(price_quote(&lines).cost_total, Decimal::MAX);
    }
}
