//! Last-known-good view of one run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::plan::{StructuredPlan, pending_plan};
use crate::review::{PhaseSnapshot, Timeline, resolve};
use crate::store::{Message, RunStatus, RuntimeState};

/// Monotonic request tags shared by everything that fetches for one run.
#[derive(Debug, Clone, Default)]
pub struct Sequence(Arc<AtomicU64>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next tag; the first call returns 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Result of one status + messages fetch.
#[derive(Debug, Clone)]
pub struct RunUpdate {
    pub seq: u64,
    pub status: RunStatus,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default)]
pub struct RunView {
    status: Option<RunStatus>,
    messages: Vec<Message>,
    last_seq: u64,
}

impl RunView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view with `update` unless a newer fetch was already applied.
    ///
    /// Returns whether the update was applied.
    pub fn apply(&mut self, update: RunUpdate) -> bool {
        if update.seq <= self.last_seq {
            trace!(seq = update.seq, last = self.last_seq, "discarding stale fetch");
            return false;
        }
        self.last_seq = update.seq;
        self.status = Some(update.status);
        self.messages = update.messages;
        true
    }

    pub fn status(&self) -> Option<&RunStatus> {
        self.status.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn runtime_state(&self) -> Option<RuntimeState> {
        self.status.as_ref().and_then(|s| s.runtime_status)
    }

    pub fn is_terminal(&self) -> bool {
        self.runtime_state().is_some_and(|s| s.is_terminal())
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        resolve(&self.messages, self.status.as_ref())
    }

    /// Plan awaiting review right now, if the tail message carries one.
    pub fn pending_plan(&self) -> Option<StructuredPlan> {
        pending_plan(&self.messages, &self.snapshot())
    }

    pub fn timeline(&self) -> Option<Timeline> {
        Timeline::from_log(&self.messages)
    }
}
