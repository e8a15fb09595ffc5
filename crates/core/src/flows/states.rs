use serde::{Deserialize, Serialize};

use crate::domain::quote::{FunnelStage, QuoteStatus};

/// The part of a quote the funnel flow reads and writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub status: QuoteStatus,
    pub funnel_stage: FunnelStage,
    pub loss_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunnelEvent {
    StatusChanged(QuoteStatus),
    StageChanged(FunnelStage),
    /// The quote was exported or sent to the client.
    QuoteShared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransitionContext {
    pub loss_reason: Option<String>,
}

/// Coupled changes made on top of the requested one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunnelAction {
    ForceFunnelStage(FunnelStage),
    ForceStatus(QuoteStatus),
    RecordLossReason,
    ClearLossReason,
    MarkSent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PipelineState,
    pub to: PipelineState,
    pub event: FunnelEvent,
    pub actions: Vec<FunnelAction>,
}
