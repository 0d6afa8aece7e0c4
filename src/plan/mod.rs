pub mod parser;
pub mod types;

pub use parser::{
    MessageView, annotate, decode_plan, fallback_text, is_plan_candidate, parse_plan,
    pending_plan,
};
pub use types::{
    BusinessRule, FieldMapping, JoinKey, SampleMapping, Step, StepKind, StepStats,
    StructuredPlan, TransformKind,
};
