use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::quote::{FunnelStage, QuoteStatus};
use crate::flows::states::{
    FunnelAction, FunnelEvent, PipelineState, TransitionContext, TransitionOutcome,
};

/// Couples quote status and funnel stage:
///
/// - approving a quote wins the deal, and winning approves the quote;
/// - rejecting a quote loses the deal, and losing rejects the quote; both need a loss reason;
/// - any stage other than lost clears the loss reason.
///
/// Every transition is explicit and validated before anything is committed.
#[derive(Clone, Copy, Debug, Default)]
pub struct FunnelEngine;

impl FunnelEngine {
    pub fn apply(
        &self,
        current: &PipelineState,
        event: &FunnelEvent,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &PipelineState,
        event: &FunnelEvent,
        context: &TransitionContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.quote_id.clone(),
                        audit.correlation_id.clone(),
                        "funnel.transition_applied",
                        AuditCategory::Funnel,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("event", format!("{:?}", outcome.event))
                    .with_metadata("from_status", outcome.from.status.as_str())
                    .with_metadata("to_status", outcome.to.status.as_str())
                    .with_metadata("from_stage", outcome.from.funnel_stage.as_str())
                    .with_metadata("to_stage", outcome.to.funnel_stage.as_str()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.quote_id.clone(),
                        audit.correlation_id.clone(),
                        "funnel.transition_rejected",
                        AuditCategory::Funnel,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("event", format!("{event:?}"))
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("a non-empty loss reason is required for {event:?}")]
    MissingLossReason { event: FunnelEvent },
}

fn transition(
    current: &PipelineState,
    event: &FunnelEvent,
    context: &TransitionContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    let mut next = current.clone();
    let mut actions = Vec::new();

    match event {
        FunnelEvent::StatusChanged(status) => {
            next.status = *status;
            match status {
                QuoteStatus::Approved => {
                    force_stage(&mut next, FunnelStage::Won, &mut actions);
                    clear_loss_reason(&mut next, &mut actions);
                }
                QuoteStatus::Rejected => {
                    let reason = required_loss_reason(event, context)?;
                    force_stage(&mut next, FunnelStage::Lost, &mut actions);
                    record_loss_reason(&mut next, reason, &mut actions);
                }
                QuoteStatus::Draft | QuoteStatus::Sent => {}
            }
        }
        FunnelEvent::StageChanged(stage) => {
            next.funnel_stage = *stage;
            match stage {
                FunnelStage::Lost => {
                    let reason = required_loss_reason(event, context)?;
                    force_status(&mut next, QuoteStatus::Rejected, &mut actions);
                    record_loss_reason(&mut next, reason, &mut actions);
                }
                FunnelStage::Won => {
                    force_status(&mut next, QuoteStatus::Approved, &mut actions);
                    clear_loss_reason(&mut next, &mut actions);
                }
                FunnelStage::Cold | FunnelStage::Warm | FunnelStage::Hot => {
                    clear_loss_reason(&mut next, &mut actions);
                }
            }
        }
        FunnelEvent::QuoteShared => {
            if current.status == QuoteStatus::Draft && !current.funnel_stage.is_closed() {
                next.status = QuoteStatus::Sent;
                actions.push(FunnelAction::MarkSent);
            }
        }
    }

    Ok(TransitionOutcome { from: current.clone(), to: next, event: event.clone(), actions })
}

fn required_loss_reason(
    event: &FunnelEvent,
    context: &TransitionContext,
) -> Result<String, FlowTransitionError> {
    context
        .loss_reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FlowTransitionError::MissingLossReason { event: event.clone() })
}

fn force_stage(next: &mut PipelineState, stage: FunnelStage, actions: &mut Vec<FunnelAction>) {
    if next.funnel_stage != stage {
        next.funnel_stage = stage;
        actions.push(FunnelAction::ForceFunnelStage(stage));
    }
}

fn force_status(next: &mut PipelineState, status: QuoteStatus, actions: &mut Vec<FunnelAction>) {
    if next.status != status {
        next.status = status;
        actions.push(FunnelAction::ForceStatus(status));
    }
}

fn record_loss_reason(next: &mut PipelineState, reason: String, actions: &mut Vec<FunnelAction>) {
    next.loss_reason = Some(reason);
    actions.push(FunnelAction::RecordLossReason);
}

fn clear_loss_reason(next: &mut PipelineState, actions: &mut Vec<FunnelAction>) {
    if next.loss_reason.take().is_some() {
        actions.push(FunnelAction::ClearLossReason);
    }
}
