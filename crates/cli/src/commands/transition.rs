use std::path::Path;

use orcamento_core::audit::AuditSink;
use orcamento_core::domain::quote::{FunnelStage, Quote, QuoteStatus};
use orcamento_core::errors::ApplicationError;
use orcamento_core::flows::{FunnelEvent, TransitionContext, TransitionOutcome};
use serde::Serialize;

use crate::commands::{new_correlation_id, read_json, CommandResult};

/// Requested change: exactly one of status or funnel stage.
#[derive(Clone, Debug)]
pub enum TransitionTarget {
    Status(String),
    Stage(String),
}

#[derive(Debug, Serialize)]
struct TransitionReport {
    outcome: TransitionOutcome,
    quote: Quote,
}

pub fn run<S: AuditSink>(
    path: &Path,
    target: TransitionTarget,
    loss_reason: Option<String>,
    actor: &str,
    sink: &S,
) -> CommandResult {
    let correlation_id = new_correlation_id("transition");
    match transition(path, target, loss_reason, actor, sink, &correlation_id) {
        Ok(report) => {
            let message = format!(
                "quote is now {} / {}",
                report.quote.status.as_str(),
                report.quote.funnel_stage.as_str()
            );
            CommandResult::success_with_data("transition", message, report)
        }
        Err(error) => CommandResult::from_error_with_id("transition", &error, correlation_id),
    }
}

fn transition<S: AuditSink>(
    path: &Path,
    target: TransitionTarget,
    loss_reason: Option<String>,
    actor: &str,
    sink: &S,
    correlation_id: &str,
) -> Result<TransitionReport, ApplicationError> {
    let event = match target {
        TransitionTarget::Status(raw) => FunnelEvent::StatusChanged(raw.parse::<QuoteStatus>()?),
        TransitionTarget::Stage(raw) => FunnelEvent::StageChanged(raw.parse::<FunnelStage>()?),
    };
    let mut quote: Quote = read_json(path)?;

    let outcome = quote.apply_transition_with_audit(
        &event,
        &TransitionContext { loss_reason },
        sink,
        correlation_id,
        actor,
    )?;

    Ok(TransitionReport { outcome, quote })
}
