//! One reviewer's session on one run.
//!
//! [`ReviewSession`] ties the store, the last-known-good [`RunView`] and the
//! [`ApprovalController`] together. Refresh results go through the view first
//! (stale ones are dropped) and are then observed by the controller.

pub mod poller;
#[cfg(test)]
pub(crate) mod testing;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::{ReviewError, TransportError};
use crate::review::{ApprovalController, ReviewSubmission};
use crate::store::{MessageStore, ReviewResponse, fetch_run};

pub use poller::Poller;
pub use view::{RunUpdate, RunView, Sequence};

pub struct ReviewSession {
    store: Arc<dyn MessageStore>,
    instance_id: String,
    sequence: Sequence,
    view: RunView,
    controller: ApprovalController,
}

impl ReviewSession {
    pub fn new(store: Arc<dyn MessageStore>, instance_id: impl Into<String>) -> Self {
        Self {
            store,
            instance_id: instance_id.into(),
            sequence: Sequence::new(),
            view: RunView::new(),
            controller: ApprovalController::new(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn view(&self) -> &RunView {
        &self.view
    }

    pub fn controller(&self) -> &ApprovalController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ApprovalController {
        &mut self.controller
    }

    /// Start background polling for this run. Feed what arrives on the
    /// receiver into [`ReviewSession::apply_update`].
    pub fn poll(&self, interval: Duration) -> (Poller, mpsc::Receiver<RunUpdate>) {
        Poller::start(
            Arc::clone(&self.store),
            self.instance_id.clone(),
            interval,
            self.sequence.clone(),
        )
    }

    /// Fetch once and apply the result.
    pub async fn refresh(&mut self) -> Result<bool, TransportError> {
        let seq = self.sequence.next();
        let (status, messages) = fetch_run(self.store.as_ref(), &self.instance_id).await?;
        Ok(self.apply_update(RunUpdate {
            seq,
            status,
            messages,
        }))
    }

    /// Apply a fetch result; returns whether it was newer than the current view.
    pub fn apply_update(&mut self, update: RunUpdate) -> bool {
        if !self.view.apply(update) {
            return false;
        }
        self.controller
            .observe(self.view.messages(), self.view.status());
        true
    }

    /// Send a submission the controller handed out and report the outcome back to it.
    ///
    /// On failure the controller returns to its pre-submission state with all
    /// comments intact, and the transport error is returned.
    pub async fn submit(
        &mut self,
        submission: &ReviewSubmission,
    ) -> Result<ReviewResponse, ReviewError> {
        let request = submission.to_request();
        match self
            .store
            .submit_review(&self.instance_id, &request)
            .await
        {
            Ok(response) => {
                info!(
                    instance_id = %self.instance_id,
                    approved = request.approved,
                    step_comments = submission.step_comments.len(),
                    "review submitted"
                );
                self.controller.submission_succeeded();
                Ok(response)
            }
            Err(e) => {
                warn!(instance_id = %self.instance_id, error = %e, "review submission failed");
                self.controller.submission_failed();
                Err(ReviewError::Transport(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Decision, ReviewMode, ReviewState};
    use crate::store::{Message, Phase, Role, RuntimeState};
    use serde_json::json;
    use crate::session::testing::FakeStore;

    fn msg(id: &str, role: Role, phase: Phase, content: &str) -> Message {
        Message {
            id: id.into(),
            thread_id: "t".into(),
            client_id: "MAF".into(),
            role,
            content: content.into(),
            phase,
            timestamp: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn plan_message(id: &str, version: u32) -> Message {
        let content = json!({
            "version": version,
            "summary": "Map MAF transactions",
            "steps": [
                {"id": "1", "type": "field_mapping", "title": "Map ids",
                 "mappings": [{"source": "TXN_ID", "target": "transaction_id", "transform": "direct"}]},
                {"id": "2", "type": "calculation", "title": "Net amount",
                 "output_field": "net", "formula": "gross - fees"}
            ]
        })
        .to_string();
        msg(id, Role::Agent, Phase::PseudocodeReview, &content)
    }

    fn session_with_plan() -> (Arc<FakeStore>, ReviewSession) {
        let store = Arc::new(FakeStore::running());
        store.push(msg("1", Role::Agent, Phase::ChangeDetection, "2 new columns"));
        store.push(plan_message("2", 1));
        let session = ReviewSession::new(store.clone(), "run-1");
        (store, session)
    }

    #[tokio::test]
    async fn refresh_opens_review_for_pending_plan() {
        let (_store, mut session) = session_with_plan();
        assert!(session.refresh().await.unwrap());

        assert_eq!(session.controller().state(), ReviewState::AwaitingDecision);
        assert_eq!(session.controller().mode(), Some(ReviewMode::Plan));
        let plan = session.view().pending_plan().unwrap();
        assert_eq!(plan.version, Some(1));
    }

    #[tokio::test]
    async fn change_request_is_flattened_on_the_wire() {
        let (store, mut session) = session_with_plan();
        session.refresh().await.unwrap();

        let controller = session.controller_mut();
        controller.request_changes().unwrap();
        controller.set_step_comment("2", "wrong formula").unwrap();
        let Decision::Submit(submission) = controller.request_changes().unwrap() else {
            panic!("Expected a submission");
        };

        let response = session.submit(&submission).await.unwrap();
        assert!(!response.approved);
        assert_eq!(session.controller().state(), ReviewState::Idle);
        assert!(session.controller().aggregator().is_empty());

        let sent = store.reviews();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].feedback.as_deref(), Some("[Step 2]: wrong formula"));
    }

    #[tokio::test]
    async fn failed_submission_restores_state_and_surfaces_error() {
        let (store, mut session) = session_with_plan();
        session.refresh().await.unwrap();
        store.fail_reviews(true);

        let controller = session.controller_mut();
        controller.request_changes().unwrap();
        controller.set_step_comment("1", "use the ledger id").unwrap();
        let Decision::Submit(submission) = controller.request_changes().unwrap() else {
            panic!("Expected a submission");
        };

        let err = session.submit(&submission).await.unwrap_err();
        assert!(matches!(err, ReviewError::Transport(_)));
        assert_eq!(session.controller().state(), ReviewState::Composing);
        assert_eq!(
            session.controller().aggregator().comment("1"),
            Some("use the ledger id")
        );
        assert!(store.reviews().is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_last_known_view() {
        let (store, mut session) = session_with_plan();
        session.refresh().await.unwrap();
        store.fail_fetches(true);

        assert!(session.refresh().await.is_err());
        assert_eq!(session.view().messages().len(), 2);
        assert_eq!(session.controller().state(), ReviewState::AwaitingDecision);
    }

    #[tokio::test]
    async fn stale_update_does_not_reach_controller() {
        let (store, mut session) = session_with_plan();
        session.refresh().await.unwrap();

        store.set_runtime(RuntimeState::Completed);
        session.refresh().await.unwrap();
        assert_eq!(session.controller().state(), ReviewState::Completed);

        let stale = RunUpdate {
            seq: 1,
            status: session.view().status().unwrap().clone(),
            messages: Vec::new(),
        };
        assert!(!session.apply_update(stale));
        assert_eq!(session.view().messages().len(), 2);
    }

    #[tokio::test]
    async fn polled_updates_drive_the_controller() {
        let (store, mut session) = session_with_plan();
        let (poller, mut rx) = session.poll(Duration::from_millis(10));

        let update = rx.recv().await.unwrap();
        assert!(session.apply_update(update));
        assert_eq!(session.controller().state(), ReviewState::AwaitingDecision);

        store.set_runtime(RuntimeState::Failed);
        loop {
            let update = rx.recv().await.unwrap();
            session.apply_update(update);
            if session.controller().state().is_terminal() {
                break;
            }
        }
        assert_eq!(session.controller().state(), ReviewState::Failed);
        poller.stop();
    }
}
