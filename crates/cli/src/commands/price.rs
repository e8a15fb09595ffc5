use std::path::Path;

use orcamento_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use orcamento_core::domain::quote::{Quote, QuoteView};
use orcamento_core::domain::user::UserRole;
use orcamento_core::errors::ApplicationError;
use serde::Serialize;
use tracing::info;

use crate::commands::{load_config, new_correlation_id, read_json, CommandResult};

const ACTOR: &str = "orcamento-cli";

#[derive(Debug, Serialize)]
struct PricedQuote {
    currency: String,
    #[serde(flatten)]
    view: QuoteView,
}

/// Recomputes every derived figure of a quote export and prints the view the role may see.
pub fn run<S: AuditSink>(path: &Path, role: UserRole, sink: &S) -> CommandResult {
    let correlation_id = new_correlation_id("price");
    match price(path, role, sink, &correlation_id) {
        Ok(priced) => {
            let message = format!("quote total {} {}", priced.view.total, priced.currency);
            CommandResult::success_with_data("price", message, priced)
        }
        Err(error) => CommandResult::from_error_with_id("price", &error, correlation_id),
    }
}

fn price<S: AuditSink>(
    path: &Path,
    role: UserRole,
    sink: &S,
    correlation_id: &str,
) -> Result<PricedQuote, ApplicationError> {
    let config = load_config()?;
    let mut quote: Quote = read_json(path)?;

    if let Err(error) = quote.recompute() {
        sink.emit(
            AuditEvent::new(
                Some(quote.id.clone()),
                correlation_id,
                "pricing.quote_rejected",
                AuditCategory::Pricing,
                ACTOR,
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", error.to_string()),
        );
        return Err(error.into());
    }

    info!(
        event_name = "quote.priced",
        quote_id = %quote.id.0,
        lines = quote.lines.len(),
        total = %quote.total,
        currency = config.quotes.currency.as_str(),
        "quote priced"
    );
    sink.emit(
        AuditEvent::new(
            Some(quote.id.clone()),
            correlation_id,
            "pricing.quote_priced",
            AuditCategory::Pricing,
            ACTOR,
            AuditOutcome::Success,
        )
        .with_metadata("lines", quote.lines.len().to_string())
        .with_metadata("total", quote.total.to_string()),
    );

    Ok(PricedQuote { currency: config.quotes.currency, view: quote.view(role.cost_visibility()) })
}
