//! Structured Plan Parser.
//!
//! Opportunistically reads an agent message as a [`StructuredPlan`]. Failure is
//! never an error to the caller: the message is simply shown as text. The
//! stored message is never touched; parsed plans live on view-local copies.

use std::borrow::Cow;

use serde::Deserialize;
use tracing::trace;

use super::types::{Step, StructuredPlan};
use crate::errors::DecodeError;
use crate::review::resolver::PhaseSnapshot;
use crate::store::{Message, Phase};

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    summary: String,
    steps: Vec<Step>,
}

/// The two text fields an unstructured pseudocode payload may still carry.
#[derive(Deserialize)]
struct LegacyPlan {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    raw_text: Option<String>,
}

/// Decode `content` as a plan.
///
/// The content must be a JSON object with a `steps` array holding at least one
/// step. `version` is optional; a missing or zero version is reported as `None`.
pub fn decode_plan(content: &str) -> Result<StructuredPlan, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).map_err(DecodeError::NotJson)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    if !object.get("steps").is_some_and(serde_json::Value::is_array) {
        return Err(DecodeError::MissingSteps);
    }

    let raw: RawPlan = serde_json::from_value(value).map_err(DecodeError::Shape)?;
    if raw.steps.is_empty() {
        return Err(DecodeError::EmptySteps);
    }

    Ok(StructuredPlan {
        version: raw.version.filter(|v| *v > 0),
        summary: raw.summary,
        steps: raw.steps,
    })
}

/// Text for reviewing pseudocode that has no usable steps.
///
/// A JSON object payload shows its `raw_text`, else its `summary`; anything
/// else is shown as sent.
pub fn fallback_text(content: &str) -> Cow<'_, str> {
    let legacy = serde_json::from_str::<serde_json::Value>(content.trim())
        .ok()
        .filter(serde_json::Value::is_object)
        .and_then(|value| LegacyPlan::deserialize(value).ok());

    let text = legacy.and_then(|legacy| {
        [legacy.raw_text, legacy.summary]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
    });
    match text {
        Some(text) => Cow::Owned(text),
        None => Cow::Borrowed(content),
    }
}

/// [`decode_plan`], with the failure reason logged and dropped.
pub fn parse_plan(content: &str) -> Option<StructuredPlan> {
    match decode_plan(content) {
        Ok(plan) => Some(plan),
        Err(e) => {
            trace!(error = %e, "content is not a structured plan");
            None
        }
    }
}

/// Agent messages in the pseudocode review phase are the only ones that may carry a plan.
pub fn is_plan_candidate(message: &Message) -> bool {
    message.is_agent() && message.phase == Phase::PseudocodeReview
}

/// The plan under review, if the latest message is a plan awaiting the reviewer.
pub fn pending_plan(messages: &[Message], snapshot: &PhaseSnapshot) -> Option<StructuredPlan> {
    if !snapshot.plan_pending_review {
        return None;
    }
    let last = messages.last()?;
    if !is_plan_candidate(last) {
        return None;
    }
    parse_plan(&last.content)
}

/// A message paired with its decoded plan, for transcript rendering.
#[derive(Debug, Clone)]
pub struct MessageView<'a> {
    pub message: &'a Message,
    pub plan: Option<StructuredPlan>,
}

/// Attach decoded plans to every plan-bearing message in the log.
pub fn annotate(messages: &[Message]) -> Vec<MessageView<'_>> {
    messages
        .iter()
        .map(|message| MessageView {
            message,
            plan: is_plan_candidate(message)
                .then(|| parse_plan(&message.content))
                .flatten(),
        })
        .collect()
}
