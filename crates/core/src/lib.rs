pub mod audit;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod import;
pub mod numbering;
pub mod pricing;

pub use dashboard::{DashboardFilters, DashboardScope, DashboardStats};
pub use domain::client::{Client, ClientId};
pub use domain::company::{Company, CompanyId};
pub use domain::product::{Product, ProductId};
pub use domain::quote::{FunnelStage, Quote, QuoteId, QuoteLine, QuoteNumber, QuoteStatus};
pub use domain::salesperson::{Salesperson, SalespersonId};
pub use domain::user::{CostVisibility, UserRole};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FunnelEngine, FunnelEvent, TransitionContext, TransitionOutcome};
pub use import::{ImportError, ImportReport};
pub use numbering::next_quote_number;
pub use pricing::{
    compute_effective_discount_percent, compute_final_value, compute_margin_percent,
    compute_quote_margin, compute_quote_total, MarginEstimate,
};
