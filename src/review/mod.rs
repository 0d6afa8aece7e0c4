//! Review cycle logic, independent of any transport or terminal.
//!
//! ## Components
//!
//! - [`resolver`]: current phase and "awaiting input" from the log tail
//! - [`timeline`]: plan revisions and the feedback that triggered them
//! - [`aggregator`]: per-step comments for the open review cycle
//! - [`feedback`]: flattening step comments into the wire feedback string
//! - [`controller`]: the approval state machine
//!
//! ## Example
//!
//! ```
//! use auditor::review::{ApprovalController, ReviewState};
//!
//! let mut controller = ApprovalController::new();
//! controller.observe(&[], None);
//! assert_eq!(controller.state(), ReviewState::Idle);
//! ```

pub mod aggregator;
pub mod controller;
pub mod feedback;
pub mod resolver;
pub mod timeline;

pub use aggregator::{ReviewSubmission, StepComment, StepReviewAggregator};
pub use controller::{ApprovalController, Decision, ReviewMode, ReviewState, Resume};
pub use feedback::{ParsedFeedback, flatten, parse as parse_feedback};
pub use resolver::{PhaseSnapshot, current_phase, is_awaiting_input, resolve};
pub use timeline::{Timeline, VersionEntry, reconstruct};
