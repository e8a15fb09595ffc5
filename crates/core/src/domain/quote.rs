use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::audit::{AuditContext, AuditSink};
use crate::domain::client::{Client, ClientId, DEFAULT_PHONE_COUNTRY_CODE};
use crate::domain::company::{Company, CompanyId};
use crate::domain::product::{Product, ProductId};
use crate::domain::salesperson::{Salesperson, SalespersonId};
use crate::domain::user::CostVisibility;
use crate::errors::DomainError;
use crate::flows::{FunnelEngine, FunnelEvent, PipelineState, TransitionContext, TransitionOutcome};
use crate::pricing::{
    checked_line_cost, checked_quote_total, compute_quote_margin, compute_quote_total, price_line,
    price_quote, LineInputs, MarginEstimate, QuotePricing, RawLineFields, MAX_PERCENT_DISCOUNTS,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Human-facing quote number, `YYYYMM` followed by a four digit sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuoteNumber(pub String);

impl fmt::Display for QuoteNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    #[serde(alias = "rascunho")]
    Draft,
    #[serde(alias = "enviado")]
    Sent,
    #[serde(alias = "aprovado")]
    Approved,
    #[serde(alias = "rejeitado")]
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [Self::Draft, Self::Sent, Self::Approved, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" | "rascunho" => Ok(Self::Draft),
            "sent" | "enviado" => Ok(Self::Sent),
            "approved" | "aprovado" => Ok(Self::Approved),
            "rejected" | "rejeitado" => Ok(Self::Rejected),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown quote status `{other}` (expected draft|sent|approved|rejected)"
            ))),
        }
    }
}

/// Sales pipeline classification, coupled to [`QuoteStatus`] by the funnel flow.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    #[default]
    #[serde(alias = "frio")]
    Cold,
    #[serde(alias = "morno")]
    Warm,
    #[serde(alias = "quente")]
    Hot,
    #[serde(alias = "ganho")]
    Won,
    #[serde(alias = "perdido")]
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub label: &'static str,
    pub description: &'static str,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 5] = [Self::Cold, Self::Warm, Self::Hot, Self::Won, Self::Lost];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Hot => "hot",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn info(self) -> StageInfo {
        match self {
            Self::Cold => StageInfo { label: "Cold", description: "No clear closing forecast." },
            Self::Warm => {
                StageInfo { label: "Warm", description: "Likely to close next month." }
            }
            Self::Hot => {
                StageInfo { label: "Hot", description: "Likely to close this month." }
            }
            Self::Won => StageInfo { label: "Won", description: "Quote approved and deal closed." },
            Self::Lost => StageInfo { label: "Lost", description: "Deal not closed." },
        }
    }

    /// Won and lost end the pipeline.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl FromStr for FunnelStage {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cold" | "frio" => Ok(Self::Cold),
            "warm" | "morno" => Ok(Self::Warm),
            "hot" | "quente" => Ok(Self::Hot),
            "won" | "ganho" => Ok(Self::Won),
            "lost" | "perdido" => Ok(Self::Lost),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown funnel stage `{other}` (expected cold|warm|hot|won|lost)"
            ))),
        }
    }
}

/// Client data copied into the quote when the client is selected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client_id: ClientId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_country_code")]
    pub phone_country_code: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

fn default_country_code() -> String {
    DEFAULT_PHONE_COUNTRY_CODE.to_string()
}

impl From<&Client> for ClientSnapshot {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.id.clone(),
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            phone_country_code: client.phone_country_code.clone(),
            tax_id: client.tax_id.clone(),
            address: client.address.clone(),
            city: client.city.clone(),
            state: client.state.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonRef {
    pub id: SalespersonId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: CompanyId,
    pub name: String,
}

/// One product entry of a quote. Derived fields are rewritten by [`QuoteLine::reprice`] on every
/// change; cost data is kept regardless of who edits the line.
///
/// Stored lines are read through [`RawLineFields`], so a missing or invalid quantity or amount
/// falls back to its default instead of failing the whole quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredQuoteLine")]
pub struct QuoteLine {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(flatten)]
    pub inputs: LineInputs,
    pub unit_cost: Option<Decimal>,
    pub final_value: Decimal,
    pub effective_discount_percent: Decimal,
    pub line_cost_total: Decimal,
    pub margin: MarginEstimate,
}

#[derive(Deserialize)]
struct StoredQuoteLine {
    product_id: ProductId,
    #[serde(default)]
    product_name: String,
    #[serde(flatten)]
    raw: RawLineFields,
    #[serde(default)]
    unit_cost: Option<Decimal>,
}

impl From<StoredQuoteLine> for QuoteLine {
    fn from(stored: StoredQuoteLine) -> Self {
        let unit_cost = stored.unit_cost.filter(|cost| *cost >= Decimal::ZERO);
        let inputs = LineInputs::normalized(&stored.raw);
        Self::new(stored.product_id, stored.product_name, inputs, unit_cost)
    }
}

impl QuoteLine {
    pub fn new(
        product_id: ProductId,
        product_name: String,
        inputs: LineInputs,
        unit_cost: Option<Decimal>,
    ) -> Self {
        let mut line = Self {
            product_id,
            product_name,
            inputs,
            unit_cost,
            final_value: Decimal::ZERO,
            effective_discount_percent: Decimal::ZERO,
            line_cost_total: Decimal::ZERO,
            margin: MarginEstimate::NotAvailable,
        };
        line.reprice();
        line
    }

    /// Quantity 1 at the product's current price and cost, no discounts.
    pub fn from_product(product: &Product) -> Self {
        Self::new(
            product.id.clone(),
            product.name.clone(),
            LineInputs { unit_price: product.price, ..LineInputs::default() },
            product.unit_cost,
        )
    }

    /// Checks the inputs and that the line cost can be represented.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.inputs.validate()?;
        if checked_line_cost(self.unit_cost, self.inputs.quantity).is_none() {
            return Err(DomainError::AmountOutOfRange(format!(
                "unit cost of `{}` times quantity {}",
                self.product_name, self.inputs.quantity
            )));
        }
        Ok(())
    }

    pub fn reprice(&mut self) {
        let pricing = price_line(&self.inputs, self.unit_cost);
        self.final_value = pricing.final_value;
        self.effective_discount_percent = pricing.effective_discount_percent;
        self.line_cost_total = pricing.line_cost_total;
        self.margin = pricing.margin;
    }

    /// Merges an edit and recomputes. A rejected edit leaves the line unchanged.
    pub fn apply_edit(&mut self, patch: &RawLineFields) -> Result<(), DomainError> {
        self.inputs = self.inputs.merge(patch)?;
        self.reprice();
        Ok(())
    }

    /// Switches the line to another product, taking over its price and cost.
    pub fn change_product(&mut self, product: &Product) {
        self.product_id = product.id.clone();
        self.product_name = product.name.clone();
        self.inputs.unit_price = product.price;
        self.unit_cost = product.unit_cost;
        self.reprice();
    }

    pub fn view(&self, visibility: CostVisibility) -> LineView {
        let visible = visibility.is_visible();
        LineView {
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            quantity: self.inputs.quantity,
            unit_price: self.inputs.unit_price,
            discount_percent: self.inputs.discount_percent,
            discount_fixed: self.inputs.discount_fixed,
            final_value: self.final_value,
            effective_discount_percent: self.effective_discount_percent,
            unit_cost: if visible { self.unit_cost } else { None },
            line_cost_total: visible.then_some(self.line_cost_total),
            margin: visible.then_some(self.margin),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: [Decimal; MAX_PERCENT_DISCOUNTS],
    pub discount_fixed: Decimal,
    pub final_value: Decimal,
    pub effective_discount_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_cost_total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<MarginEstimate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    #[serde(default)]
    pub number: Option<QuoteNumber>,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    #[serde(default)]
    pub client: Option<ClientSnapshot>,
    #[serde(default)]
    pub salesperson: Option<SalespersonRef>,
    #[serde(default)]
    pub company: Option<CompanyRef>,
    #[serde(default)]
    pub lines: Vec<QuoteLine>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub funnel_stage: FunnelStage,
    #[serde(default)]
    pub loss_reason: Option<String>,
    #[serde(default)]
    pub crm_deal_id: Option<String>,
    /// Creation time. Store exports call it `created_date` and may omit the offset (read as UTC).
    #[serde(default, alias = "created_date", deserialize_with = "deserialize_created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(at.and_utc()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| Some(at.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid creation time `{raw}`")))
}

impl Quote {
    /// Empty draft dated `date`, valid for `validity_days`.
    pub fn new_draft(date: NaiveDate, validity_days: u32) -> Result<Self, DomainError> {
        let valid_until = date.checked_add_days(Days::new(u64::from(validity_days))).ok_or_else(
            || DomainError::InvariantViolation(format!("validity of {validity_days} days overflows")),
        )?;

        Ok(Self {
            id: QuoteId::generate(),
            number: None,
            date,
            valid_until,
            client: None,
            salesperson: None,
            company: None,
            lines: Vec::new(),
            notes: String::new(),
            total: Decimal::ZERO,
            status: QuoteStatus::Draft,
            funnel_stage: FunnelStage::Cold,
            loss_reason: None,
            crm_deal_id: None,
            created_at: Some(Utc::now()),
        })
    }

    pub fn set_client(&mut self, client: &Client) {
        self.client = Some(ClientSnapshot::from(client));
    }

    pub fn set_salesperson(&mut self, salesperson: &Salesperson) {
        self.salesperson =
            Some(SalespersonRef { id: salesperson.id.clone(), name: salesperson.name.clone() });
    }

    pub fn set_company(&mut self, company: &Company) {
        self.company = Some(CompanyRef { id: company.id.clone(), name: company.name.clone() });
    }

    pub fn add_line(&mut self, line: QuoteLine) {
        self.lines.push(line);
        self.refresh_total();
    }

    pub fn add_product(&mut self, product: &Product) {
        self.add_line(QuoteLine::from_product(product));
    }

    pub fn update_line(&mut self, index: usize, patch: &RawLineFields) -> Result<(), DomainError> {
        self.line_mut(index)?.apply_edit(patch)?;
        self.refresh_total();
        Ok(())
    }

    pub fn change_line_product(
        &mut self,
        index: usize,
        product: &Product,
    ) -> Result<(), DomainError> {
        self.line_mut(index)?.change_product(product);
        self.refresh_total();
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> Result<QuoteLine, DomainError> {
        if index >= self.lines.len() {
            return Err(DomainError::LineOutOfRange { index, len: self.lines.len() });
        }
        let removed = self.lines.remove(index);
        self.refresh_total();
        Ok(removed)
    }

    /// Validates every line and recomputes all derived figures, e.g. after loading from the store.
    /// Nothing changes when a line or the total is out of range.
    pub fn recompute(&mut self) -> Result<(), DomainError> {
        for line in &self.lines {
            line.validate()?;
        }
        let mut lines = self.lines.clone();
        for line in &mut lines {
            line.reprice();
        }
        let total = checked_quote_total(&lines)
            .ok_or_else(|| DomainError::AmountOutOfRange("quote total".to_string()))?;

        self.lines = lines;
        self.total = total;
        Ok(())
    }

    pub fn pricing(&self) -> QuotePricing {
        price_quote(&self.lines)
    }

    pub fn margin(&self) -> MarginEstimate {
        compute_quote_margin(&self.lines, self.total)
    }

    pub fn pipeline(&self) -> PipelineState {
        PipelineState {
            status: self.status,
            funnel_stage: self.funnel_stage,
            loss_reason: self.loss_reason.clone(),
        }
    }

    /// Applies a status or funnel stage change. Nothing changes when validation fails.
    pub fn apply_transition(
        &mut self,
        event: &FunnelEvent,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = FunnelEngine.apply(&self.pipeline(), event, context)?;
        self.set_pipeline(&outcome.to);
        Ok(outcome)
    }

    /// Same as [`Quote::apply_transition`], recording the attempt in `sink` either way.
    pub fn apply_transition_with_audit<S>(
        &mut self,
        event: &FunnelEvent,
        context: &TransitionContext,
        sink: &S,
        correlation_id: &str,
        actor: &str,
    ) -> Result<TransitionOutcome, DomainError>
    where
        S: AuditSink,
    {
        let audit = AuditContext::new(Some(self.id.clone()), correlation_id, actor);
        let outcome =
            FunnelEngine.apply_with_audit(&self.pipeline(), event, context, sink, &audit)?;
        self.set_pipeline(&outcome.to);
        Ok(outcome)
    }

    /// Called when the quote is shared or exported: an open draft becomes sent.
    pub fn mark_sent(&mut self) -> bool {
        let shared = FunnelEngine.apply(
            &self.pipeline(),
            &FunnelEvent::QuoteShared,
            &TransitionContext::default(),
        );
        match shared {
            Ok(outcome) if outcome.from != outcome.to => {
                self.set_pipeline(&outcome.to);
                true
            }
            _ => false,
        }
    }

    pub fn assign_number(&mut self, number: QuoteNumber) {
        self.number = Some(number);
    }

    /// Checks what the quote needs before it can be stored; every missing field is reported.
    pub fn validate_for_save(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.client.is_none() {
            missing.push("client".to_string());
        }
        if self.lines.is_empty() {
            missing.push("lines".to_string());
        }
        if self.salesperson.is_none() {
            missing.push("salesperson".to_string());
        }
        if self.funnel_stage == FunnelStage::Lost && !has_text(self.loss_reason.as_deref()) {
            missing.push("loss_reason".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::MissingRequiredFields(missing))
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_until < today
    }

    pub fn view(&self, visibility: CostVisibility) -> QuoteView {
        let pricing = self.pricing();
        let visible = visibility.is_visible();
        QuoteView {
            id: self.id.clone(),
            number: self.number.clone(),
            date: self.date,
            valid_until: self.valid_until,
            client_name: self.client.as_ref().map(|client| client.name.clone()),
            salesperson_name: self.salesperson.as_ref().map(|salesperson| salesperson.name.clone()),
            status: self.status,
            funnel_stage: self.funnel_stage,
            loss_reason: self.loss_reason.clone(),
            lines: self.lines.iter().map(|line| line.view(visibility)).collect(),
            subtotal: pricing.subtotal,
            discount_total: pricing.discount_total,
            total: pricing.total,
            cost_total: visible.then_some(pricing.cost_total),
            margin: visible.then_some(pricing.margin),
        }
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut QuoteLine, DomainError> {
        let len = self.lines.len();
        self.lines.get_mut(index).ok_or(DomainError::LineOutOfRange { index, len })
    }

    fn refresh_total(&mut self) {
        self.total = compute_quote_total(&self.lines);
    }

    fn set_pipeline(&mut self, state: &PipelineState) {
        self.status = state.status;
        self.funnel_stage = state.funnel_stage;
        self.loss_reason = state.loss_reason.clone();
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.map(|text| !text.trim().is_empty()).unwrap_or(false)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteView {
    pub id: QuoteId,
    pub number: Option<QuoteNumber>,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub client_name: Option<String>,
    pub salesperson_name: Option<String>,
    pub status: QuoteStatus,
    pub funnel_stage: FunnelStage,
    pub loss_reason: Option<String>,
    pub lines: Vec<LineView>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<MarginEstimate>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{FunnelStage, Quote, QuoteLine, QuoteStatus};
    use crate::audit::InMemoryAuditSink;
    use crate::domain::client::{Client, ClientId};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::salesperson::{Salesperson, SalespersonId};
    use crate::domain::user::CostVisibility;
    use crate::errors::DomainError;
    use crate::flows::{FunnelEvent, TransitionContext};
    use crate::pricing::{MarginEstimate, RawLineFields};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }

    fn product(id: &str, price: i64, unit_cost: Option<i64>) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: format!("Produto {id}"),
            code: None,
            price: Decimal::from(price),
            unit_cost: unit_cost.map(Decimal::from),
            description: None,
            image_url: None,
        }
    }

    fn client() -> Client {
        Client {
            id: ClientId("c-1".to_string()),
            name: "Metalúrgica Silva".to_string(),
            erp_code: Some("000123".to_string()),
            phone_country_code: "+55".to_string(),
            phone: Some("11987654321".to_string()),
            email: Some("compras@silva.com.br".to_string()),
            address: None,
            city: Some("Campinas".to_string()),
            state: Some("SP".to_string()),
            tax_id: Some("12.345.678/0001-90".to_string()),
        }
    }

    fn salesperson() -> Salesperson {
        Salesperson {
            id: SalespersonId("s-1".to_string()),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            title: None,
            photo_url: None,
            crm_owner_id: None,
        }
    }

    fn draft() -> Quote {
        match Quote::new_draft(date(2026, 3, 10), 30) {
            Ok(quote) => quote,
            Err(error) => panic!("draft creation failed: {error}"),
        }
    }

    fn discount_patch(first: i64, second: i64, fixed: i64) -> RawLineFields {
        RawLineFields {
            discount_percent: [
                Some(Decimal::from(first)),
                Some(Decimal::from(second)),
                None,
                None,
                None,
            ],
            discount_fixed: Some(Decimal::from(fixed)),
            ..RawLineFields::default()
        }
    }

    #[test]
    fn new_draft_starts_cold_and_valid_for_the_configured_days() {
        let quote = draft();
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.funnel_stage, FunnelStage::Cold);
        assert_eq!(quote.valid_until, date(2026, 4, 9));
        assert!(!quote.is_expired(date(2026, 4, 9)));
        assert!(quote.is_expired(date(2026, 4, 10)));
    }

    #[test]
    fn line_from_product_copies_price_and_cost() {
        let line = QuoteLine::from_product(&product("p-1", 250, Some(90)));
        assert_eq!(line.inputs.quantity, 1);
        assert_eq!(line.inputs.unit_price, Decimal::from(250));
        assert_eq!(line.final_value, Decimal::from(250));
        assert_eq!(line.line_cost_total, Decimal::from(90));
        assert!(line.margin.is_available());
    }

    #[test]
    fn every_line_change_recomputes_the_total() -> Result<(), DomainError> {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, Some(45)));
        quote.add_product(&product("p-2", 24, None));
        assert_eq!(quote.total, Decimal::from(124));

        quote.update_line(0, &discount_patch(10, 10, 5))?;
        assert_eq!(quote.lines[0].final_value, Decimal::from(76));
        assert_eq!(quote.lines[0].effective_discount_percent, Decimal::from(24));
        assert_eq!(quote.total, Decimal::from(100));
        assert_eq!(quote.margin().to_string(), "50.00%");

        let removed = quote.remove_line(1)?;
        assert_eq!(removed.product_id, ProductId("p-2".to_string()));
        assert_eq!(quote.total, Decimal::from(76));
        Ok(())
    }

    #[test]
    fn rejected_edit_leaves_line_and_total_untouched() -> Result<(), DomainError> {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.update_line(0, &discount_patch(10, 0, 0))?;
        let before = quote.clone();

        let result = quote.update_line(0, &discount_patch(10, 150, 0));

        assert!(matches!(result, Err(DomainError::DiscountOutOfRange { slot: 2, .. })));
        assert_eq!(quote.total, Decimal::from(90));
        assert_eq!(quote.lines[0].inputs, before.lines[0].inputs);
        assert_eq!(quote, before);
        Ok(())
    }

    #[test]
    fn accepted_edit_after_rejection_reaggregates_from_kept_values() -> Result<(), DomainError> {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.add_product(&product("p-2", 50, None));
        quote.update_line(0, &discount_patch(10, 0, 0))?;
        assert_eq!(quote.total, Decimal::from(140));

        assert!(quote.update_line(0, &discount_patch(10, 150, 0)).is_err());
        assert_eq!(quote.total, Decimal::from(140));

        quote.update_line(1, &RawLineFields { quantity: Some(2), ..RawLineFields::default() })?;
        assert_eq!(quote.lines[0].final_value, Decimal::from(90));
        assert_eq!(quote.total, Decimal::from(190));
        Ok(())
    }

    #[test]
    fn line_index_out_of_range_is_reported() {
        let mut quote = draft();
        assert_eq!(
            quote.update_line(3, &RawLineFields::default()),
            Err(DomainError::LineOutOfRange { index: 3, len: 0 })
        );
        assert!(quote.remove_line(0).is_err());
    }

    #[test]
    fn changing_product_takes_new_price_and_cost() -> Result<(), DomainError> {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.update_line(0, &RawLineFields { quantity: Some(3), ..RawLineFields::default() })?;

        quote.change_line_product(0, &product("p-2", 40, Some(10)))?;

        let line = &quote.lines[0];
        assert_eq!(line.product_name, "Produto p-2");
        assert_eq!(line.inputs.quantity, 3);
        assert_eq!(line.final_value, Decimal::from(120));
        assert_eq!(line.line_cost_total, Decimal::from(30));
        assert_eq!(quote.total, Decimal::from(120));
        Ok(())
    }

    #[test]
    fn seller_view_hides_cost_but_stored_line_keeps_it() {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, Some(45)));

        let seller = quote.view(CostVisibility::Hidden);
        assert_eq!(seller.lines[0].line_cost_total, None);
        assert_eq!(seller.lines[0].margin, None);
        assert_eq!(seller.margin, None);
        assert_eq!(quote.lines[0].line_cost_total, Decimal::from(45));

        let admin = quote.view(CostVisibility::Visible);
        assert_eq!(admin.lines[0].unit_cost, Some(Decimal::from(45)));
        assert_eq!(admin.cost_total, Some(Decimal::from(45)));
        assert_eq!(admin.margin, Some(MarginEstimate::Percent(Decimal::from(50))));
    }

    #[test]
    fn save_validation_lists_all_missing_fields() {
        let mut quote = draft();
        quote.funnel_stage = FunnelStage::Lost;

        assert_eq!(
            quote.validate_for_save(),
            Err(DomainError::MissingRequiredFields(vec![
                "client".to_string(),
                "lines".to_string(),
                "salesperson".to_string(),
                "loss_reason".to_string(),
            ]))
        );
    }

    #[test]
    fn complete_quote_passes_save_validation() {
        let mut quote = draft();
        quote.set_client(&client());
        quote.set_salesperson(&salesperson());
        quote.add_product(&product("p-1", 100, None));

        assert!(quote.validate_for_save().is_ok());
        assert_eq!(quote.client.as_ref().map(|client| client.city.as_deref()), Some(Some("Campinas")));
    }

    #[test]
    fn approving_wins_the_deal() -> Result<(), DomainError> {
        let mut quote = draft();
        quote.apply_transition(
            &FunnelEvent::StatusChanged(QuoteStatus::Approved),
            &TransitionContext::default(),
        )?;
        assert_eq!(quote.funnel_stage, FunnelStage::Won);
        Ok(())
    }

    #[test]
    fn failed_transition_changes_nothing() {
        let mut quote = draft();
        let before = quote.clone();
        let result = quote.apply_transition(
            &FunnelEvent::StageChanged(FunnelStage::Lost),
            &TransitionContext { loss_reason: Some("   ".to_string()) },
        );

        assert!(matches!(result, Err(DomainError::FlowTransition(_))));
        assert_eq!(quote, before);
    }

    #[test]
    fn audited_transition_records_the_quote_id() -> Result<(), DomainError> {
        let sink = InMemoryAuditSink::default();
        let mut quote = draft();
        quote.apply_transition_with_audit(
            &FunnelEvent::StatusChanged(QuoteStatus::Rejected),
            &TransitionContext { loss_reason: Some("prazo".to_string()) },
            &sink,
            "req-5",
            "ana@example.com",
        )?;

        let events = sink.events();
        assert_eq!(quote.funnel_stage, FunnelStage::Lost);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quote_id.as_ref(), Some(&quote.id));
        assert_eq!(events[0].actor, "ana@example.com");
        Ok(())
    }

    #[test]
    fn sharing_marks_open_drafts_as_sent() -> Result<(), DomainError> {
        let mut quote = draft();
        assert!(quote.mark_sent());
        assert_eq!(quote.status, QuoteStatus::Sent);
        assert!(!quote.mark_sent());

        let mut won = draft();
        won.apply_transition(
            &FunnelEvent::StageChanged(FunnelStage::Won),
            &TransitionContext::default(),
        )?;
        won.status = QuoteStatus::Draft;
        assert!(!won.mark_sent());
        Ok(())
    }

    #[test]
    fn store_export_with_portuguese_enums_loads_and_recomputes() -> Result<(), String> {
        let raw = r#"{
            "id": "q-1",
            "date": "2026-03-10",
            "valid_until": "2026-04-09",
            "status": "enviado",
            "funnel_stage": "quente",
            "lines": [
                {
                    "product_id": "p-1",
                    "product_name": "Bomba",
                    "quantity": 2,
                    "unit_price": "50.00",
                    "discount_percent": ["10", "10", "0", "0", "0"],
                    "discount_fixed": "5",
                    "unit_cost": "22.50"
                }
            ]
        }"#;

        let mut quote: Quote = serde_json::from_str(raw).map_err(|error| error.to_string())?;
        quote.recompute().map_err(|error| error.to_string())?;

        assert_eq!(quote.status, QuoteStatus::Sent);
        assert_eq!(quote.funnel_stage, FunnelStage::Hot);
        assert_eq!(quote.total, Decimal::from(76));
        assert_eq!(quote.lines[0].line_cost_total, Decimal::from(45));
        Ok(())
    }

    #[test]
    fn recompute_rejects_out_of_range_stored_discounts() {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.lines[0].inputs.discount_percent[4] = Decimal::from(101);

        assert!(matches!(quote.recompute(), Err(DomainError::DiscountOutOfRange { slot: 5, .. })));
    }

    fn stored_line(quantity: &str) -> Result<QuoteLine, String> {
        let raw = format!(
            r#"{{"product_id": "p-1", "product_name": "Bomba", "quantity": {quantity},
                "unit_price": "40.00", "unit_cost": "-3"}}"#
        );
        serde_json::from_str(&raw).map_err(|error| error.to_string())
    }

    #[test]
    fn stored_lines_with_invalid_quantity_default_to_one() -> Result<(), String> {
        for quantity in ["0", "null", "-2"] {
            let line = stored_line(quantity)?;
            assert_eq!(line.inputs.quantity, 1, "quantity {quantity}");
            assert_eq!(line.final_value, Decimal::from(40));
            assert_eq!(line.unit_cost, None);
        }
        Ok(())
    }

    #[test]
    fn stored_line_without_pricing_fields_loads_with_defaults() -> Result<(), String> {
        let line: QuoteLine =
            serde_json::from_str(r#"{"product_id": "p-9"}"#).map_err(|error| error.to_string())?;

        assert_eq!(line.inputs.quantity, 1);
        assert_eq!(line.inputs.unit_price, Decimal::ZERO);
        assert_eq!(line.final_value, Decimal::ZERO);
        Ok(())
    }

    #[test]
    fn recompute_rejects_overflowing_line_and_keeps_the_quote() {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.lines[0].inputs.unit_price = Decimal::MAX;
        quote.lines[0].inputs.quantity = 10;
        let before = quote.clone();

        assert!(matches!(quote.recompute(), Err(DomainError::AmountOutOfRange(_))));
        assert_eq!(quote, before);
    }

    #[test]
    fn recompute_rejects_overflowing_line_cost() {
        let mut quote = draft();
        quote.add_product(&product("p-1", 100, None));
        quote.lines[0].unit_cost = Some(Decimal::MAX);
        quote.lines[0].inputs.quantity = 2;

        assert!(matches!(quote.recompute(), Err(DomainError::AmountOutOfRange(_))));
    }

    #[test]
    fn recompute_rejects_overflowing_total() {
        let mut quote = draft();
        let mut huge = product("p-1", 1, None);
        huge.price = Decimal::MAX;
        quote.add_product(&huge);
        quote.add_product(&huge);

        assert_eq!(
            quote.recompute(),
            Err(DomainError::AmountOutOfRange("quote total".to_string()))
        );
    }

    #[test]
    fn creation_time_reads_store_field_name_and_may_be_missing() -> Result<(), String> {
        let base = r#""id": "q-1", "date": "2026-03-10", "valid_until": "2026-04-09""#;
        let parse = |extra: &str| -> Result<Quote, String> {
            serde_json::from_str(&format!("{{{base}{extra}}}")).map_err(|error| error.to_string())
        };

        assert_eq!(parse("")?.created_at, None);
        assert_eq!(parse(r#", "created_date": null"#)?.created_at, None);

        let naive = parse(r#", "created_date": "2026-03-10T09:15:00.123000""#)?;
        let stamp = naive.created_at.map(|at| at.format("%Y-%m-%d %H:%M").to_string());
        assert_eq!(stamp.as_deref(), Some("2026-03-10 09:15"));

        let offset = parse(r#", "created_at": "2026-03-10T23:30:00-03:00""#)?;
        assert_eq!(offset.created_at.map(|at| at.date_naive()), Some(date(2026, 3, 11)));

        assert!(parse(r#", "created_date": "yesterday""#).is_err());
        Ok(())
    }

    #[test]
    fn status_and_stage_parse_from_either_language() {
        assert_eq!("rejeitado".parse::<QuoteStatus>(), Ok(QuoteStatus::Rejected));
        assert_eq!("Approved".parse::<QuoteStatus>(), Ok(QuoteStatus::Approved));
        assert_eq!("morno".parse::<FunnelStage>(), Ok(FunnelStage::Warm));
        assert!("closed".parse::<FunnelStage>().is_err());
        assert_eq!(FunnelStage::Hot.info().label, "Hot");
    }
}
