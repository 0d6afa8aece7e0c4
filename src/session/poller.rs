//! Background refresh of a run's status and message log.
//!
//! One fetch is issued per tick. Fetches are allowed to overlap when the
//! orchestrator is slower than the interval; every result carries the sequence
//! tag it was issued with so the receiver can drop out-of-order completions.
//! Failed fetches are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::view::{RunUpdate, Sequence};
use crate::store::{MessageStore, fetch_run};

const CHANNEL_CAPACITY: usize = 16;

/// Polling task scoped to one run. Dropping it stops polling and discards any
/// fetch still in flight.
#[derive(Debug)]
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling `instance_id` every `interval`. The first fetch goes out immediately.
    pub fn start(
        store: Arc<dyn MessageStore>,
        instance_id: impl Into<String>,
        interval: Duration,
        sequence: Sequence,
    ) -> (Self, mpsc::Receiver<RunUpdate>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let instance_id = instance_id.into();
        let handle = tokio::spawn(poll_loop(store, instance_id, interval, sequence, tx));
        (Self { handle }, rx)
    }

    pub fn stop(self) {
        // Drop aborts the task.
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_loop(
    store: Arc<dyn MessageStore>,
    instance_id: String,
    interval: Duration,
    sequence: Sequence,
    tx: mpsc::Sender<RunUpdate>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Aborted together with this task.
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let seq = sequence.next();
                let store = Arc::clone(&store);
                let instance_id = instance_id.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    match fetch_run(store.as_ref(), &instance_id).await {
                        Ok((status, messages)) => {
                            trace!(seq, messages = messages.len(), "fetched run");
                            let _ = tx.send(RunUpdate { seq, status, messages }).await;
                        }
                        Err(e) => debug!(seq, error = %e, "poll failed, retrying next tick"),
                    }
                });
            }
            Some(_) = in_flight.join_next() => {}
            _ = tx.closed() => {
                debug!(instance_id = %instance_id, "update receiver closed, stopping poller");
                break;
            }
        }
    }
}
