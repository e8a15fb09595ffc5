use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;
use crate::domain::product::ProductId;
use crate::domain::quote::{FunnelStage, Quote, QuoteStatus};
use crate::domain::salesperson::{find_by_user_email, Salesperson, SalespersonId};
use crate::domain::user::UserRole;

/// Optional narrowing an administrator can apply to the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilters {
    pub salesperson: Option<SalespersonId>,
    pub client: Option<ClientId>,
    pub product: Option<ProductId>,
    pub funnel_stage: Option<FunnelStage>,
}

/// Which quotes a viewer is allowed to see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardScope {
    All(DashboardFilters),
    Salesperson(SalespersonId),
    Nothing,
}

impl DashboardScope {
    /// Admins see every quote, narrowed by `filters`. Sellers see the quotes of the salesperson
    /// linked to their email and ignore filters; without a link they see nothing.
    pub fn for_viewer(
        role: UserRole,
        user_email: &str,
        salespeople: &[Salesperson],
        filters: DashboardFilters,
    ) -> Self {
        if role.is_admin() {
            return Self::All(filters);
        }
        match find_by_user_email(salespeople, user_email) {
            Some(salesperson) => Self::Salesperson(salesperson.id.clone()),
            None => Self::Nothing,
        }
    }

    pub fn includes(&self, quote: &Quote) -> bool {
        match self {
            Self::All(filters) => filters.matches(quote),
            Self::Salesperson(id) => belongs_to(quote, id),
            Self::Nothing => false,
        }
    }

    pub fn select<'a>(&self, quotes: &'a [Quote]) -> Vec<&'a Quote> {
        quotes.iter().filter(|quote| self.includes(quote)).collect()
    }
}

impl DashboardFilters {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn matches(&self, quote: &Quote) -> bool {
        if let Some(id) = &self.salesperson {
            if !belongs_to(quote, id) {
                return false;
            }
        }
        if let Some(id) = &self.client {
            if quote.client.as_ref().map(|client| &client.client_id) != Some(id) {
                return false;
            }
        }
        if let Some(id) = &self.product {
            if !quote.lines.iter().any(|line| &line.product_id == id) {
                return false;
            }
        }
        if let Some(stage) = self.funnel_stage {
            if quote.funnel_stage != stage {
                return false;
            }
        }
        true
    }
}

fn belongs_to(quote: &Quote, id: &SalespersonId) -> bool {
    quote.salesperson.as_ref().is_some_and(|salesperson| &salesperson.id == id)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub quote_count: usize,
    pub total_value: Decimal,
    /// Approved quotes over all quotes, in percent with one decimal place.
    pub approval_rate: Decimal,
    pub created_today: usize,
    pub by_stage: BTreeMap<FunnelStage, usize>,
    pub by_status: BTreeMap<QuoteStatus, usize>,
}

impl DashboardStats {
    pub fn compute(quotes: &[&Quote], today: NaiveDate) -> Self {
        let mut by_stage =
            FunnelStage::ALL.into_iter().map(|stage| (stage, 0)).collect::<BTreeMap<_, _>>();
        let mut by_status =
            QuoteStatus::ALL.into_iter().map(|status| (status, 0)).collect::<BTreeMap<_, _>>();
        let mut total_value = Decimal::ZERO;
        let mut created_today = 0;

        for quote in quotes {
            total_value = total_value.saturating_add(quote.total);
            *by_stage.entry(quote.funnel_stage).or_default() += 1;
            *by_status.entry(quote.status).or_default() += 1;
            // undated quotes never count as created today
            if quote.created_at.map(|at| at.date_naive()) == Some(today) {
                created_today += 1;
            }
        }

        let approved = by_status.get(&QuoteStatus::Approved).copied().unwrap_or_default();
        Self {
            quote_count: quotes.len(),
            total_value,
            approval_rate: approval_rate(approved, quotes.len()),
            created_today,
            by_stage,
            by_status,
        }
    }
}

fn approval_rate(approved: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(approved) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
