pub mod engine;
pub mod states;

pub use engine::{FlowTransitionError, FunnelEngine};
pub use states::{FunnelAction, FunnelEvent, PipelineState, TransitionContext, TransitionOutcome};
