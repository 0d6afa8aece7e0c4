use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who authored a message. `Auditor` is the human reviewer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    Auditor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Auditor => "auditor",
        }
    }
}

/// Pipeline stage a message was written in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ChangeDetection,
    PseudocodeReview,
    CodeGeneration,
    OutputReview,
    /// Any tag the orchestrator sends that this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangeDetection => "change_detection",
            Self::PseudocodeReview => "pseudocode_review",
            Self::CodeGeneration => "code_generation",
            Self::OutputReview => "output_review",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChangeDetection => "Change Detection",
            Self::PseudocodeReview => "Pseudocode Review",
            Self::CodeGeneration => "Code Generation",
            Self::OutputReview => "Output Review",
            Self::Unknown => "Unknown Phase",
        }
    }

    /// Phases in which the agent's latest message is a reviewable artifact.
    pub fn is_review_phase(&self) -> bool {
        matches!(self, Self::PseudocodeReview | Self::OutputReview)
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change_detection" => Ok(Self::ChangeDetection),
            "pseudocode_review" => Ok(Self::PseudocodeReview),
            "code_generation" => Ok(Self::CodeGeneration),
            "output_review" => Ok(Self::OutputReview),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

/// One entry of a run's append-only message log, exactly as the orchestrator sent it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub client_id: String,
    pub role: Role,
    pub content: String,
    pub phase: Phase,
    /// Server-formatted creation time, kept verbatim.
    pub timestamp: String,
}

impl Message {
    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}

/// Runtime state of an orchestration instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuntimeState {
    Pending,
    Running,
    Completed,
    Failed,
    /// Stopped from outside before it finished
    Terminated,
    /// Any other host state (`Suspended`, `ContinuedAsNew`, ...); never reviewable
    #[serde(other)]
    Other,
}

impl RuntimeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Terminated => "Terminated",
            Self::Other => "Unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Terminated)
    }
}

/// Status snapshot returned by `GET /transform/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStatus {
    pub instance_id: String,
    #[serde(default)]
    pub runtime_status: Option<RuntimeState>,
    #[serde(default)]
    pub custom_status: serde_json::Value,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_updated_time: Option<String>,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        self.runtime_status == Some(RuntimeState::Running)
    }
}

/// Body of `POST /transform`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartTransformRequest {
    pub client_id: String,
    pub mapping_path: String,
    pub data_path: String,
}

impl StartTransformRequest {
    /// Fill any field the caller left out from the configured development defaults.
    pub fn with_defaults(
        client_id: Option<String>,
        mapping_path: Option<String>,
        data_path: Option<String>,
        defaults: &crate::config::DefaultsConfig,
    ) -> Self {
        fn pick(value: Option<String>, fallback: &str) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        }

        Self {
            client_id: pick(client_id, &defaults.client_id),
            mapping_path: pick(mapping_path, &defaults.mapping_path),
            data_path: pick(data_path, &defaults.data_path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartTransformResponse {
    pub instance_id: String,
    pub client_id: String,
}

/// Body of `POST /transform/{id}/review`. Step comments are already flattened
/// into `feedback` by the time this is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewRequest {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewResponse {
    pub status: String,
    pub approved: bool,
}
