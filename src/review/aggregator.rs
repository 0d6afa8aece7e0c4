//! Step Review Aggregator.
//!
//! Holds the reviewer's in-progress annotations for one review cycle and compiles
//! them into a [`ReviewSubmission`]. The pending map is independent of the fetched
//! log; only a successful submission clears it.

use serde::{Deserialize, Serialize};

use super::feedback;
use crate::store::ReviewRequest;

/// A reviewer note attached to one step of the plan under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepComment {
    pub step_id: String,
    pub comment: String,
}

/// The outbound review decision, produced once at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub approved: bool,
    pub feedback: Option<String>,
    pub step_comments: Vec<StepComment>,
}

impl ReviewSubmission {
    pub fn approve() -> Self {
        Self {
            approved: true,
            ..Default::default()
        }
    }

    /// A rejection carrying free text only (the free-form reply path).
    pub fn reply(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            approved: false,
            feedback: (!text.is_empty()).then_some(text),
            step_comments: Vec::new(),
        }
    }

    pub fn has_content(&self) -> bool {
        self.feedback.is_some() || !self.step_comments.is_empty()
    }

    /// Wire body, with step comments flattened into `feedback`.
    pub fn to_request(&self) -> ReviewRequest {
        let flat = feedback::flatten(self.feedback.as_deref().unwrap_or(""), &self.step_comments);
        ReviewRequest {
            approved: self.approved,
            feedback: (!flat.is_empty()).then_some(flat),
        }
    }
}

/// Insertion-ordered step id → comment map for the outstanding review cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReviewAggregator {
    comments: Vec<StepComment>,
}

impl StepReviewAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the comment for `step_id`; an empty text removes it.
    ///
    /// Text is stored as given. Overwriting keeps the comment where it was.
    pub fn set_comment(&mut self, step_id: &str, text: &str) {
        let existing = self.comments.iter().position(|c| c.step_id == step_id);

        match (existing, text.is_empty()) {
            (Some(idx), true) => {
                self.comments.remove(idx);
            }
            (Some(idx), false) => self.comments[idx].comment = text.to_string(),
            (None, true) => {}
            (None, false) => self.comments.push(StepComment {
                step_id: step_id.to_string(),
                comment: text.to_string(),
            }),
        }
    }

    pub fn comment(&self, step_id: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|c| c.step_id == step_id)
            .map(|c| c.comment.as_str())
    }

    pub fn comments(&self) -> &[StepComment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.comments.is_empty()
    }

    /// Build a change request from `general_feedback` and the current comments.
    ///
    /// Does not clear anything; the caller clears once the submission succeeded.
    pub fn compile(&self, general_feedback: &str) -> ReviewSubmission {
        let general = general_feedback.trim();
        ReviewSubmission {
            approved: false,
            feedback: (!general.is_empty()).then(|| general.to_string()),
            step_comments: self.comments.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.comments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_comment_upserts_in_insertion_order() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("3", "first");
        agg.set_comment("1", "second");
        agg.set_comment("3", "revised");

        let ids: Vec<&str> = agg.comments().iter().map(|c| c.step_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(agg.comment("3"), Some("revised"));
    }

    #[test]
    fn empty_comment_removes_annotation() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("2", "wrong formula");
        assert!(agg.has_pending());
        agg.set_comment("2", "");
        assert!(!agg.has_pending());
        assert_eq!(agg.comment("2"), None);

        // removing something that is not there is a no-op
        agg.set_comment("9", "");
        assert!(agg.is_empty());
    }

    #[test]
    fn comment_text_is_stored_verbatim() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("2", "  indented: keep\n    nested");
        assert_eq!(agg.comment("2"), Some("  indented: keep\n    nested"));

        agg.set_comment("3", "   ");
        assert_eq!(agg.comment("3"), Some("   "));
    }

    #[test]
    fn removed_then_readded_goes_to_the_end() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("a", "1");
        agg.set_comment("b", "2");
        agg.set_comment("a", "");
        agg.set_comment("a", "3");
        let ids: Vec<&str> = agg.comments().iter().map(|c| c.step_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn compile_does_not_mutate_state() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("2", "wrong formula");
        let before = agg.clone();

        let submission = agg.compile("");
        assert_eq!(agg, before);
        assert!(!submission.approved);
        assert_eq!(submission.feedback, None);
        assert_eq!(submission.step_comments.len(), 1);
    }

    #[test]
    fn compiled_request_flattens_exactly() {
        let mut agg = StepReviewAggregator::new();
        agg.set_comment("2", "wrong formula");
        let req = agg.compile("").to_request();
        assert_eq!(req.feedback.as_deref(), Some("[Step 2]: wrong formula"));
        assert!(!req.approved);

        let req = agg.compile("  Tighten the filters.  ").to_request();
        assert_eq!(
            req.feedback.as_deref(),
            Some("Tighten the filters.\n\n[Step 2]: wrong formula")
        );
    }

    #[test]
    fn approve_request_has_no_feedback() {
        let req = ReviewSubmission::approve().to_request();
        assert!(req.approved);
        assert_eq!(req.feedback, None);
    }

    #[test]
    fn reply_is_a_rejection_with_text() {
        let submission = ReviewSubmission::reply("use the March file");
        assert!(!submission.approved);
        assert!(submission.has_content());
        assert_eq!(
            submission.to_request().feedback.as_deref(),
            Some("use the March file")
        );
        assert!(!ReviewSubmission::reply("").has_content());
    }
}
