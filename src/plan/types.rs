//! Structured plan types.
//!
//! An agent in the `pseudocode_review` phase may send its proposed
//! transformation as JSON: a version, a summary and an ordered list of steps.
//! Steps are a closed set of six variants discriminated by `type`; anything
//! else degrades to [`StepKind::Unknown`] so a single odd step never hides the
//! rest of the plan.

use serde::{Deserialize, Deserializer};
use tracing::trace;

/// A versioned, ordered transformation plan proposed by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPlan {
    /// Version from the payload; `None` when absent (or zero) so the timeline infers it.
    pub version: Option<u32>,
    pub summary: String,
    pub steps: Vec<Step>,
}

/// Counts shown on the plan summary card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Total source→target mappings across all field-mapping steps
    pub field_mappings: usize,
    /// Number of lookup-join steps
    pub lookups: usize,
    /// Total condition→action rules across all business-rule steps
    pub business_rules: usize,
}

impl StructuredPlan {
    pub fn stats(&self) -> StepStats {
        let mut stats = StepStats::default();
        for step in &self.steps {
            match &step.kind {
                StepKind::FieldMapping { mappings } => stats.field_mappings += mappings.len(),
                StepKind::LookupJoin { .. } => stats.lookups += 1,
                StepKind::BusinessRule { rules } => stats.business_rules += rules.len(),
                StepKind::Filter { .. }
                | StepKind::Calculation { .. }
                | StepKind::Output { .. }
                | StepKind::Unknown { .. } => {}
            }
        }
        stats
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// One step of a plan: shared header plus a variant body.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Unique within this plan only; ids are not stable across versions.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    FieldMapping {
        mappings: Vec<FieldMapping>,
    },
    LookupJoin {
        join_key: JoinKey,
        output_field: String,
        #[serde(default)]
        filter: Option<String>,
        #[serde(default)]
        sample_mappings: Vec<SampleMapping>,
    },
    BusinessRule {
        rules: Vec<BusinessRule>,
    },
    Filter {
        condition: String,
        #[serde(default)]
        exclude: bool,
    },
    Calculation {
        output_field: String,
        formula: String,
    },
    Output {
        format: String,
        destination: String,
    },
    /// A type tag we do not know, or a known tag whose body did not match.
    #[serde(skip)]
    Unknown { type_name: String },
}

impl StepKind {
    /// Wire tag of the variant (`"field_mapping"`, ...).
    pub fn type_name(&self) -> &str {
        match self {
            Self::FieldMapping { .. } => "field_mapping",
            Self::LookupJoin { .. } => "lookup_join",
            Self::BusinessRule { .. } => "business_rule",
            Self::Filter { .. } => "filter",
            Self::Calculation { .. } => "calculation",
            Self::Output { .. } => "output",
            Self::Unknown { type_name } => type_name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::FieldMapping { .. } => "Field Mapping",
            Self::LookupJoin { .. } => "Lookup Join",
            Self::BusinessRule { .. } => "Business Rules",
            Self::Filter { .. } => "Filter",
            Self::Calculation { .. } => "Calculation",
            Self::Output { .. } => "Output",
            Self::Unknown { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Direct,
    Rename,
    Formula,
    Lookup,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Rename => "rename",
            Self::Formula => "formula",
            Self::Lookup => "lookup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldMapping {
    pub source: String,
    pub target: String,
    pub transform: TransformKind,
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinKey {
    pub source: String,
    pub lookup: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleMapping {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessRule {
    pub condition: String,
    pub action: String,
}

/// Header fields plus whatever else the step carried.
#[derive(Deserialize)]
struct RawStep {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    body: serde_json::Map<String, serde_json::Value>,
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawStep::deserialize(deserializer)?;

        let mut body = raw.body;
        body.insert(
            "type".to_string(),
            serde_json::Value::String(raw.type_name.clone()),
        );
        let kind = match serde_json::from_value::<StepKind>(serde_json::Value::Object(body)) {
            Ok(kind) => kind,
            Err(e) => {
                trace!(step = %raw.id, step_type = %raw.type_name, error = %e, "step degraded to unknown");
                StepKind::Unknown {
                    type_name: raw.type_name,
                }
            }
        };

        Ok(Step {
            id: raw.id,
            title: raw.title,
            description: raw.description.filter(|d| !d.is_empty()),
            kind,
        })
    }
}

/// Agents emit step ids as either `"2"` or `2`.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "step id must be a string or number, got {}",
            other
        ))),
    }
}
