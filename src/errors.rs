//! Typed error hierarchy for the review console.
//!
//! Three enums cover the three ways things go wrong:
//! - `TransportError`: any failed call to the orchestrator API
//! - `DecodeError`: message content that looks like a plan but is not one
//! - `ReviewError`: review actions the controller refuses, plus transport failures
//!   surfaced during submission

use thiserror::Error;

/// Errors from the orchestrator boundary.
///
/// Non-2xx responses, network failures and response bodies that do not match the
/// expected shape all land here. Polling swallows them; submission surfaces them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response body from {endpoint}: {message}")]
    Body { endpoint: String, message: String },
}

impl TransportError {
    /// The endpoint the failed request was sent to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Request { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Body { endpoint, .. } => endpoint,
        }
    }
}

/// Reasons a message's content could not be read as a structured plan.
///
/// Never shown to the reviewer; the message simply falls back to plain text.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("content is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("content is JSON but not an object")]
    NotAnObject,

    #[error("plan has no steps array")]
    MissingSteps,

    #[error("plan has zero steps")]
    EmptySteps,

    #[error("plan does not match the expected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Errors from the approval controller and the submission path.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Cannot submit a change request without general feedback or step comments")]
    InvalidSubmission,

    #[error("Cannot {action} while the review is {state}")]
    ActionUnavailable { action: &'static str, state: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
