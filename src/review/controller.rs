//! Approval Controller.
//!
//! The state machine that gates reviewer actions against the resolved phase and
//! run status:
//!
//! ```text
//!            observe(awaiting)                approve (no comments)
//!   Idle ───────────────────────▶ AwaitingDecision ──────────────────────▶ Submitting
//!    ▲                              │    ▲     │ approve (comments)           │  │
//!    │                              │    │     ▼                              │  │
//!    │            request_changes   │    │  ConfirmingApproval ── confirm ───▶│  │
//!    │                              ▼    │ cancel / decline                   │  │
//!    │                            Composing ── request_changes (content) ───▶│  │
//!    │                                                                        │  │
//!    └────────────────────── submission_succeeded ◀──────────────────────────┘  │
//!                           submission_failed → back to the state before ◀──────┘
//!
//!   any state ── run Completed / Failed ──▶ Completed / Failed (absorbing)
//!   (a Terminated run ends in Failed)
//! ```
//!
//! Confirmation of "approve with pending comments" is an explicit state rather
//! than a blocking prompt, so the controller runs without any UI attached.

use std::fmt;

use tracing::{debug, info};

use super::aggregator::{ReviewSubmission, StepReviewAggregator};
use super::resolver::{PhaseSnapshot, resolve};
use crate::errors::ReviewError;
use crate::plan::pending_plan;
use crate::store::{Message, Phase, RunStatus, RuntimeState};

/// What kind of decision the reviewer is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// A structured plan with reviewable steps
    Plan,
    /// Pseudocode review whose content did not decode as a plan
    RawPlan,
    /// Generated output awaiting sign-off
    Output,
    /// Agent is waiting on a free-text reply outside the review phases
    FreeForm,
}

impl ReviewMode {
    /// Derive the mode from a resolved snapshot, or `None` when nothing awaits the reviewer.
    pub fn from_snapshot(messages: &[Message], snapshot: &PhaseSnapshot) -> Option<Self> {
        if !snapshot.awaiting_input {
            return None;
        }
        if !snapshot.plan_pending_review {
            return Some(Self::FreeForm);
        }
        match snapshot.phase {
            Some(Phase::PseudocodeReview) => Some(if pending_plan(messages, snapshot).is_some() {
                Self::Plan
            } else {
                Self::RawPlan
            }),
            _ => Some(Self::Output),
        }
    }

    /// Whether approve / request-changes are offered (as opposed to a plain reply).
    pub fn is_decision(&self) -> bool {
        !matches!(self, Self::FreeForm)
    }
}

/// State to return to when a submission fails or a confirmation is declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    AwaitingDecision,
    Composing,
}

impl Resume {
    fn state(self) -> ReviewState {
        match self {
            Self::AwaitingDecision => ReviewState::AwaitingDecision,
            Self::Composing => ReviewState::Composing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewState {
    #[default]
    Idle,
    AwaitingDecision,
    /// Approve was requested while step comments are pending
    ConfirmingApproval {
        pending_comments: usize,
        resume: Resume,
    },
    Composing,
    Submitting {
        resume: Resume,
    },
    Completed,
    Failed,
}

impl ReviewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingDecision => write!(f, "awaiting a decision"),
            Self::ConfirmingApproval { .. } => write!(f, "confirming approval"),
            Self::Composing => write!(f, "composing feedback"),
            Self::Submitting { .. } => write!(f, "submitting"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a reviewer action that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send this to the orchestrator, then report back with
    /// [`ApprovalController::submission_succeeded`] or
    /// [`ApprovalController::submission_failed`].
    Submit(ReviewSubmission),
    /// Ask the reviewer whether pending comments may be discarded; answer with
    /// [`ApprovalController::confirm_approval`].
    ConfirmDiscard { pending_comments: usize },
    /// The feedback surface is now open.
    Composing,
}

#[derive(Debug, Default)]
pub struct ApprovalController {
    state: ReviewState,
    mode: Option<ReviewMode>,
    aggregator: StepReviewAggregator,
    general_feedback: String,
    /// Tail agent message of the cycle currently offered to the reviewer
    cycle_message_id: Option<String>,
    /// Tail agent message whose cycle a successful submission resolved
    resolved_message_id: Option<String>,
}

impl ApprovalController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn mode(&self) -> Option<ReviewMode> {
        self.mode
    }

    pub fn aggregator(&self) -> &StepReviewAggregator {
        &self.aggregator
    }

    pub fn general_feedback(&self) -> &str {
        &self.general_feedback
    }

    /// Whether review actions should be enabled right now.
    pub fn can_act(&self) -> bool {
        matches!(
            self.state,
            ReviewState::AwaitingDecision
                | ReviewState::ConfirmingApproval { .. }
                | ReviewState::Composing
        )
    }

    fn transition(&mut self, next: ReviewState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "review state changed");
            self.state = next;
        }
    }

    fn unavailable(&self, action: &'static str) -> ReviewError {
        ReviewError::ActionUnavailable {
            action,
            state: self.state.to_string(),
        }
    }

    fn has_drafts(&self) -> bool {
        self.aggregator.has_pending() || !self.general_feedback.is_empty()
    }

    /// Fold a freshly fetched log and status into the state machine.
    ///
    /// Never clears pending comments or an open feedback surface while the
    /// same agent message is under review. Opening a review for a newer
    /// agent message starts from an empty draft.
    pub fn observe(&mut self, messages: &[Message], status: Option<&RunStatus>) {
        if self.state.is_terminal() {
            return;
        }
        match status.and_then(|s| s.runtime_status) {
            Some(RuntimeState::Completed) => {
                self.mode = None;
                self.transition(ReviewState::Completed);
                return;
            }
            Some(RuntimeState::Failed | RuntimeState::Terminated) => {
                self.mode = None;
                self.transition(ReviewState::Failed);
                return;
            }
            _ => {}
        }

        let snapshot = resolve(messages, status);
        let mode = ReviewMode::from_snapshot(messages, &snapshot);
        let tail_id = messages.last().map(|m| m.id.clone());
        let already_resolved = tail_id.is_some() && tail_id == self.resolved_message_id;
        let open = mode.filter(|_| !already_resolved);

        debug!(phase = ?snapshot.phase, awaiting = snapshot.awaiting_input, mode = ?open, "observed run");

        match (self.state, open) {
            // Actions stay disabled until the in-flight request resolves.
            (ReviewState::Submitting { .. }, _) => {}
            (ReviewState::Idle, Some(mode)) => {
                // Drafts belong to the cycle they were written in; step ids
                // are not stable across plan versions.
                if self.cycle_message_id != tail_id && self.has_drafts() {
                    debug!(
                        stale_cycle = ?self.cycle_message_id,
                        "discarding drafts from a previous review cycle"
                    );
                    self.aggregator.clear();
                    self.general_feedback.clear();
                }
                self.mode = Some(mode);
                self.cycle_message_id = tail_id;
                self.transition(ReviewState::AwaitingDecision);
            }
            (ReviewState::Idle, None) => {}
            (ReviewState::AwaitingDecision | ReviewState::ConfirmingApproval { .. }, None) => {
                self.mode = None;
                self.transition(ReviewState::Idle);
            }
            (_, Some(mode)) => {
                self.mode = Some(mode);
                self.cycle_message_id = tail_id;
            }
            (ReviewState::Composing, None) => {}
            (ReviewState::Completed | ReviewState::Failed, None) => {}
        }
    }

    /// Annotate a step. Empty text removes the annotation.
    pub fn set_step_comment(&mut self, step_id: &str, text: &str) -> Result<(), ReviewError> {
        if !matches!(
            self.state,
            ReviewState::AwaitingDecision | ReviewState::Composing
        ) {
            return Err(self.unavailable("comment on a step"));
        }
        self.aggregator.set_comment(step_id, text);
        Ok(())
    }

    /// Replace the general feedback draft.
    pub fn set_general_feedback(&mut self, text: &str) -> Result<(), ReviewError> {
        if self.state.is_terminal() {
            return Err(self.unavailable("edit feedback"));
        }
        self.general_feedback = text.to_string();
        Ok(())
    }

    pub fn approve(&mut self) -> Result<Decision, ReviewError> {
        let resume = match self.state {
            ReviewState::AwaitingDecision => Resume::AwaitingDecision,
            ReviewState::Composing => Resume::Composing,
            _ => return Err(self.unavailable("approve")),
        };
        if !self.mode.is_some_and(|m| m.is_decision()) {
            return Err(self.unavailable("approve"));
        }

        if self.aggregator.has_pending() {
            let pending_comments = self.aggregator.len();
            self.transition(ReviewState::ConfirmingApproval {
                pending_comments,
                resume,
            });
            return Ok(Decision::ConfirmDiscard { pending_comments });
        }

        self.transition(ReviewState::Submitting { resume });
        Ok(Decision::Submit(ReviewSubmission::approve()))
    }

    /// Answer the discard-comments confirmation.
    ///
    /// Returns the approval to submit when confirmed, `None` when declined.
    pub fn confirm_approval(
        &mut self,
        confirmed: bool,
    ) -> Result<Option<ReviewSubmission>, ReviewError> {
        let ReviewState::ConfirmingApproval { resume, .. } = self.state else {
            return Err(self.unavailable("confirm approval"));
        };
        if confirmed {
            self.transition(ReviewState::Submitting { resume });
            Ok(Some(ReviewSubmission::approve()))
        } else {
            self.transition(resume.state());
            Ok(None)
        }
    }

    /// First call opens the feedback surface; a second call submits it.
    ///
    /// Submitting with neither general feedback nor step comments is refused
    /// with [`ReviewError::InvalidSubmission`] and changes nothing.
    pub fn request_changes(&mut self) -> Result<Decision, ReviewError> {
        if !self.mode.is_some_and(|m| m.is_decision()) {
            return Err(self.unavailable("request changes"));
        }
        match self.state {
            ReviewState::AwaitingDecision => {
                self.transition(ReviewState::Composing);
                Ok(Decision::Composing)
            }
            ReviewState::Composing => {
                let submission = self.aggregator.compile(&self.general_feedback);
                if !submission.has_content() {
                    return Err(ReviewError::InvalidSubmission);
                }
                self.transition(ReviewState::Submitting {
                    resume: Resume::Composing,
                });
                Ok(Decision::Submit(submission))
            }
            _ => Err(self.unavailable("request changes")),
        }
    }

    /// Close the feedback surface without submitting. Step comments are kept.
    pub fn cancel_composing(&mut self) -> Result<(), ReviewError> {
        if self.state != ReviewState::Composing {
            return Err(self.unavailable("cancel feedback"));
        }
        self.general_feedback.clear();
        self.transition(ReviewState::AwaitingDecision);
        Ok(())
    }

    /// Free-form reply outside the structured review phases: an implicit
    /// rejection carrying only `text`.
    pub fn reply(&mut self, text: &str) -> Result<ReviewSubmission, ReviewError> {
        if self.state != ReviewState::AwaitingDecision
            || self.mode != Some(ReviewMode::FreeForm)
        {
            return Err(self.unavailable("reply"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ReviewError::InvalidSubmission);
        }
        self.transition(ReviewState::Submitting {
            resume: Resume::AwaitingDecision,
        });
        Ok(ReviewSubmission::reply(text))
    }

    /// The in-flight submission was accepted. Ends the review cycle.
    pub fn submission_succeeded(&mut self) {
        self.aggregator.clear();
        self.general_feedback.clear();
        self.resolved_message_id = self.cycle_message_id.take();
        if let ReviewState::Submitting { .. } = self.state {
            self.mode = None;
            self.transition(ReviewState::Idle);
        }
    }

    /// The in-flight submission failed; return to where the reviewer was,
    /// keeping every comment and draft for a retry.
    pub fn submission_failed(&mut self) {
        if let ReviewState::Submitting { resume } = self.state {
            self.transition(resume.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use serde_json::json;

    fn plan(version: u32) -> String {
        json!({
            "version": version,
            "summary": "Map fund transactions",
            "steps": [
                {"id": "A", "type": "calculation", "title": "A", "output_field": "x", "formula": "1"},
                {"id": "B", "type": "filter", "title": "B", "condition": "x > 0"}
            ]
        })
        .to_string()
    }

    fn msg(id: &str, role: Role, phase: Phase, content: &str) -> Message {
        Message {
            id: id.into(),
            thread_id: "t".into(),
            client_id: "c".into(),
            role,
            content: content.into(),
            phase,
            timestamp: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn status(state: RuntimeState) -> RunStatus {
        RunStatus {
            instance_id: "i".into(),
            runtime_status: Some(state),
            custom_status: serde_json::Value::Null,
            output: serde_json::Value::Null,
            created_time: None,
            last_updated_time: None,
        }
    }

    fn plan_log() -> Vec<Message> {
        vec![
            msg("1", Role::Agent, Phase::ChangeDetection, "3 new columns"),
            msg("2", Role::Agent, Phase::PseudocodeReview, &plan(1)),
        ]
    }

    fn awaiting_plan() -> ApprovalController {
        let mut c = ApprovalController::new();
        c.observe(&plan_log(), Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert_eq!(c.mode(), Some(ReviewMode::Plan));
        c
    }

    #[test]
    fn idle_until_agent_waits() {
        let mut c = ApprovalController::new();
        c.observe(&[], Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::Idle);

        let log = vec![msg("1", Role::Agent, Phase::PseudocodeReview, &plan(1))];
        c.observe(&log, Some(&status(RuntimeState::Pending)));
        assert_eq!(c.state(), ReviewState::Idle);
    }

    #[test]
    fn mode_reflects_phase_and_plan() {
        let running = status(RuntimeState::Running);
        let cases = [
            (Phase::PseudocodeReview, plan(1), ReviewMode::Plan),
            (Phase::PseudocodeReview, "plain text".to_string(), ReviewMode::RawPlan),
            (Phase::OutputReview, "output ready".to_string(), ReviewMode::Output),
            (Phase::CodeGeneration, "which file?".to_string(), ReviewMode::FreeForm),
            (Phase::ChangeDetection, "confirm?".to_string(), ReviewMode::FreeForm),
        ];
        for (phase, content, expected) in cases {
            let mut c = ApprovalController::new();
            c.observe(&[msg("1", Role::Agent, phase, &content)], Some(&running));
            assert_eq!(c.mode(), Some(expected), "phase={:?}", phase);
        }
    }

    #[test]
    fn approve_without_comments_submits() {
        let mut c = awaiting_plan();
        let decision = c.approve().unwrap();
        assert_eq!(decision, Decision::Submit(ReviewSubmission::approve()));
        assert_eq!(
            c.state(),
            ReviewState::Submitting {
                resume: Resume::AwaitingDecision
            }
        );
        c.submission_succeeded();
        assert_eq!(c.state(), ReviewState::Idle);
    }

    #[test]
    fn approve_with_comments_requires_confirmation() {
        let mut c = awaiting_plan();
        c.set_step_comment("A", "wrong formula").unwrap();

        let decision = c.approve().unwrap();
        assert_eq!(decision, Decision::ConfirmDiscard { pending_comments: 1 });

        // declining leaves everything as it was and submits nothing
        assert_eq!(c.confirm_approval(false).unwrap(), None);
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert_eq!(c.aggregator().comment("A"), Some("wrong formula"));

        c.approve().unwrap();
        let submission = c.confirm_approval(true).unwrap().unwrap();
        assert!(submission.approved);
        assert!(submission.step_comments.is_empty());
        c.submission_succeeded();
        assert!(!c.aggregator().has_pending());
    }

    #[test]
    fn request_changes_opens_then_submits() {
        let mut c = awaiting_plan();
        assert_eq!(c.request_changes().unwrap(), Decision::Composing);
        assert_eq!(c.state(), ReviewState::Composing);

        c.set_step_comment("2", "wrong formula").unwrap();
        let Decision::Submit(submission) = c.request_changes().unwrap() else {
            panic!("Expected a submission");
        };
        assert_eq!(
            submission.to_request().feedback.as_deref(),
            Some("[Step 2]: wrong formula")
        );
        assert_eq!(
            c.state(),
            ReviewState::Submitting {
                resume: Resume::Composing
            }
        );
    }

    #[test]
    fn empty_change_request_is_a_no_op() {
        let mut c = awaiting_plan();
        c.request_changes().unwrap();
        c.set_general_feedback("   ").unwrap();

        let err = c.request_changes().unwrap_err();
        assert!(matches!(err, ReviewError::InvalidSubmission));
        assert_eq!(c.state(), ReviewState::Composing);
    }

    #[test]
    fn failed_submission_keeps_feedback_for_retry() {
        let mut c = awaiting_plan();
        c.request_changes().unwrap();
        c.set_step_comment("A", "use fund code").unwrap();
        c.set_general_feedback("close, but").unwrap();
        c.request_changes().unwrap();

        c.submission_failed();
        assert_eq!(c.state(), ReviewState::Composing);
        assert_eq!(c.aggregator().comment("A"), Some("use fund code"));
        assert_eq!(c.general_feedback(), "close, but");

        let Decision::Submit(retry) = c.request_changes().unwrap() else {
            panic!("Expected a submission");
        };
        assert_eq!(
            retry.to_request().feedback.as_deref(),
            Some("close, but\n\n[Step A]: use fund code")
        );
        c.submission_succeeded();
        assert_eq!(c.state(), ReviewState::Idle);
        assert!(c.aggregator().is_empty());
        assert_eq!(c.general_feedback(), "");
    }

    #[test]
    fn refresh_does_not_close_composer_or_drop_comments() {
        let mut c = awaiting_plan();
        c.request_changes().unwrap();
        c.set_step_comment("B", "exclude instead").unwrap();

        // another client answered; log tail is now the auditor
        let mut log = plan_log();
        log.push(msg("3", Role::Auditor, Phase::PseudocodeReview, "ok"));
        c.observe(&log, Some(&status(RuntimeState::Running)));

        assert_eq!(c.state(), ReviewState::Composing);
        assert_eq!(c.aggregator().comment("B"), Some("exclude instead"));
    }

    #[test]
    fn awaiting_decision_closes_when_agent_no_longer_waits() {
        let mut c = awaiting_plan();
        c.set_step_comment("A", "keep me").unwrap();
        let mut log = plan_log();
        log.push(msg("3", Role::Auditor, Phase::PseudocodeReview, "done elsewhere"));
        c.observe(&log, Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::Idle);
        assert_eq!(c.aggregator().comment("A"), Some("keep me"));
    }

    #[test]
    fn new_cycle_does_not_inherit_comments_from_previous_plan() {
        let mut c = awaiting_plan();
        c.set_step_comment("A", "wrong formula (about v1 step A)").unwrap();
        c.set_general_feedback("v1 draft").unwrap();

        let mut log = plan_log();
        log.push(msg("3", Role::Auditor, Phase::PseudocodeReview, "answered elsewhere"));
        c.observe(&log, Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::Idle);

        log.push(msg("4", Role::Agent, Phase::PseudocodeReview, &plan(2)));
        c.observe(&log, Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert!(c.aggregator().is_empty());
        assert_eq!(c.general_feedback(), "");
    }

    #[test]
    fn same_plan_reopening_keeps_comments() {
        let mut c = awaiting_plan();
        c.set_step_comment("A", "keep me").unwrap();

        // a log without the plan closes the review, the same tail reopens it
        c.observe(&plan_log()[..1], Some(&status(RuntimeState::Pending)));
        assert_eq!(c.state(), ReviewState::Idle);
        c.observe(&plan_log(), Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert_eq!(c.aggregator().comment("A"), Some("keep me"));
    }

    #[test]
    fn answered_cycle_is_not_reopened_by_stale_log() {
        let mut c = awaiting_plan();
        c.approve().unwrap();
        c.submission_succeeded();

        // orchestrator has not appended the reviewer's message yet
        c.observe(&plan_log(), Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::Idle);

        let mut log = plan_log();
        log.push(msg("3", Role::Auditor, Phase::PseudocodeReview, "approved"));
        log.push(msg("4", Role::Agent, Phase::OutputReview, "output ready"));
        c.observe(&log, Some(&status(RuntimeState::Running)));
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert_eq!(c.mode(), Some(ReviewMode::Output));
    }

    #[test]
    fn submitting_ignores_refresh_but_not_termination() {
        let mut c = awaiting_plan();
        c.approve().unwrap();
        c.observe(&[], Some(&status(RuntimeState::Running)));
        assert!(matches!(c.state(), ReviewState::Submitting { .. }));
        assert!(!c.can_act());

        c.observe(&plan_log(), Some(&status(RuntimeState::Completed)));
        assert_eq!(c.state(), ReviewState::Completed);
        c.submission_succeeded();
        assert_eq!(c.state(), ReviewState::Completed);
    }

    #[test]
    fn terminal_states_absorb() {
        for terminal in [
            RuntimeState::Completed,
            RuntimeState::Failed,
            RuntimeState::Terminated,
        ] {
            let mut c = awaiting_plan();
            c.observe(&plan_log(), Some(&status(terminal)));
            assert!(c.state().is_terminal());

            let mut log = plan_log();
            log.push(msg("9", Role::Agent, Phase::OutputReview, "more"));
            c.observe(&log, Some(&status(RuntimeState::Running)));
            assert!(c.state().is_terminal());
            assert!(c.approve().is_err());
            assert!(c.request_changes().is_err());
            assert!(c.set_general_feedback("x").is_err());
        }
    }

    #[test]
    fn terminated_run_ends_as_failed() {
        let mut c = awaiting_plan();
        c.observe(&plan_log(), Some(&status(RuntimeState::Terminated)));
        assert_eq!(c.state(), ReviewState::Failed);
    }

    #[test]
    fn unrecognised_host_state_is_not_reviewable() {
        let mut c = ApprovalController::new();
        c.observe(&plan_log(), Some(&status(RuntimeState::Other)));
        assert_eq!(c.state(), ReviewState::Idle);

        let mut c = awaiting_plan();
        c.observe(&plan_log(), Some(&status(RuntimeState::Other)));
        assert_eq!(c.state(), ReviewState::Idle);
    }

    #[test]
    fn free_form_reply_uses_submission_path() {
        let mut c = ApprovalController::new();
        let log = vec![msg("1", Role::Agent, Phase::CodeGeneration, "Which sheet?")];
        c.observe(&log, Some(&status(RuntimeState::Running)));
        assert_eq!(c.mode(), Some(ReviewMode::FreeForm));

        assert!(c.approve().is_err());
        assert!(c.request_changes().is_err());
        assert!(matches!(c.reply("  "), Err(ReviewError::InvalidSubmission)));
        assert_eq!(c.state(), ReviewState::AwaitingDecision);

        let submission = c.reply("Use the March tab").unwrap();
        assert!(!submission.approved);
        assert_eq!(submission.feedback.as_deref(), Some("Use the March tab"));
        assert!(submission.step_comments.is_empty());

        c.submission_failed();
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
    }

    #[test]
    fn reply_is_not_offered_for_plan_review() {
        let mut c = awaiting_plan();
        assert!(matches!(
            c.reply("text"),
            Err(ReviewError::ActionUnavailable { action: "reply", .. })
        ));
    }

    #[test]
    fn cancel_composing_keeps_step_comments() {
        let mut c = awaiting_plan();
        c.request_changes().unwrap();
        c.set_step_comment("A", "x").unwrap();
        c.set_general_feedback("draft").unwrap();
        c.cancel_composing().unwrap();
        assert_eq!(c.state(), ReviewState::AwaitingDecision);
        assert_eq!(c.general_feedback(), "");
        assert!(c.aggregator().has_pending());
    }

    #[test]
    fn comments_rejected_outside_review() {
        let mut c = ApprovalController::new();
        assert!(c.set_step_comment("A", "x").is_err());
    }
}
