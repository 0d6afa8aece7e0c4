//! Version Timeline Reconstructor.
//!
//! Replays the message log to recover the sequence of plan revisions and the
//! reviewer feedback that triggered each one. A pure fold over the log: the
//! same log always yields the same timeline.

use crate::plan::{is_plan_candidate, parse_plan};
use crate::store::{Message, Phase, Role};

/// One plan revision found in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Payload version, or the 1-based position among plan messages when absent
    pub version: u32,
    pub timestamp: String,
    /// Id of the agent message carrying this revision
    pub message_id: String,
    pub is_initial: bool,
    /// Reviewer message immediately preceding this revision in the same phase
    pub feedback_before: Option<String>,
}

/// Scan the log once and collect every plan revision, in order.
pub fn reconstruct(messages: &[Message]) -> Vec<VersionEntry> {
    let mut entries: Vec<VersionEntry> = Vec::new();

    for (i, msg) in messages.iter().enumerate() {
        if !is_plan_candidate(msg) {
            continue;
        }
        let Some(plan) = parse_plan(&msg.content) else {
            continue;
        };

        let position = entries.len() as u32 + 1;
        let feedback_before = i
            .checked_sub(1)
            .map(|prev| &messages[prev])
            .filter(|prev| prev.role == Role::Auditor && prev.phase == Phase::PseudocodeReview)
            .map(|prev| prev.content.clone());

        entries.push(VersionEntry {
            version: plan.version.unwrap_or(position),
            timestamp: msg.timestamp.clone(),
            message_id: msg.id.clone(),
            is_initial: position == 1,
            feedback_before,
        });
    }

    entries
}

/// Revision history worth showing: at least two versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<VersionEntry>,
}

impl Timeline {
    /// Build the timeline, or `None` when there is nothing to compare against.
    pub fn from_log(messages: &[Message]) -> Option<Self> {
        Self::from_entries(reconstruct(messages))
    }

    pub fn from_entries(entries: Vec<VersionEntry>) -> Option<Self> {
        (entries.len() > 1).then_some(Self { entries })
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest revision.
    pub fn current(&self) -> &VersionEntry {
        // from_entries guarantees at least two entries
        &self.entries[self.entries.len() - 1]
    }

    /// Earlier revisions, most recent first.
    pub fn previous(&self) -> impl Iterator<Item = &VersionEntry> {
        self.entries[..self.entries.len() - 1].iter().rev()
    }
}
