//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                |
//! |------------|-------------------------------------------------|
//! | `run`      | `Start`, `Status`, `Messages`, `History`, `Watch` |
//! | `decide`   | `Approve`, `Reject`, `Reply`                    |
//! | `review`   | `Review`                                        |
//! | `config`   | `Config`                                        |

pub mod config;
pub mod decide;
pub mod review;
pub mod run;

use std::sync::Arc;

use anyhow::Result;
use auditor::config::AuditorConfig;
use auditor::session::ReviewSession;
use auditor::store::{HttpMessageStore, MessageStore};

pub use config::cmd_config;
pub use decide::{cmd_approve, cmd_reject, cmd_reply};
pub use review::cmd_review;
pub use run::{cmd_history, cmd_messages, cmd_start, cmd_status, cmd_watch};

/// Everything a command needs to talk to the orchestrator.
pub struct Context {
    pub config: AuditorConfig,
    pub store: Arc<dyn MessageStore>,
}

impl Context {
    pub fn new(config: AuditorConfig) -> Result<Self> {
        let store = HttpMessageStore::new(&config.api.url, config.request_timeout())?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn session(&self, instance_id: &str) -> ReviewSession {
        ReviewSession::new(Arc::clone(&self.store), instance_id)
    }
}
