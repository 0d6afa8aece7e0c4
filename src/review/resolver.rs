//! Phase Resolver.
//!
//! Derives the pipeline's current phase and whether the human is being waited
//! on, purely from the tail of the message log and the run status. Recompute
//! on every fetch; never store the result apart from the log it came from.

use crate::store::{Message, Phase, Role, RunStatus};

/// What the tail of the log says about the run right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSnapshot {
    /// Phase of the last message, `None` for an empty log.
    pub phase: Option<Phase>,
    /// Run is `Running`, the log is non-empty and the last author is the agent.
    pub awaiting_input: bool,
    /// Awaiting input and the phase is `pseudocode_review` or `output_review`.
    pub plan_pending_review: bool,
}

/// Phase of the last message, if any.
pub fn current_phase(messages: &[Message]) -> Option<Phase> {
    messages.last().map(|m| m.phase)
}

pub fn is_awaiting_input(messages: &[Message], status: Option<&RunStatus>) -> bool {
    let running = status.is_some_and(RunStatus::is_running);
    running && messages.last().is_some_and(|m| m.role == Role::Agent)
}

pub fn resolve(messages: &[Message], status: Option<&RunStatus>) -> PhaseSnapshot {
    let phase = current_phase(messages);
    let awaiting_input = is_awaiting_input(messages, status);
    let plan_pending_review = awaiting_input && phase.is_some_and(|p| p.is_review_phase());

    PhaseSnapshot {
        phase,
        awaiting_input,
        plan_pending_review,
    }
}
