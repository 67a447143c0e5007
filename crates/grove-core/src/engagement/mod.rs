//! Engagement state machine and moment orchestration.

pub mod context;
pub mod event;
pub mod machine;
pub mod moment;

pub use context::{EngagementContext, Journey, LensSource, Waypoint};
pub use event::EngagementEvent;
pub use machine::{EngagementMachine, SessionState, TerminalState};
pub use moment::{
    EvaluationContext, EvaluationResult, Moment, MomentSurface, MomentTrigger, TriggerStage,
    eligible_moments, evaluate_trigger, top_moment,
};
