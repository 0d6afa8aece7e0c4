//! Text rendering of runs, plans and revision history.
//!
//! Everything here returns a `String` so commands decide where it goes and
//! tests can assert on it. Styling goes through `console`, which drops colors
//! when stdout is not a terminal.

use chrono::{DateTime, Local};
use console::style;
use terminal_size::{Width, terminal_size};

use super::icons;
use crate::plan::{FieldMapping, MessageView, Step, StepKind, StructuredPlan, fallback_text};
use crate::review::{StepReviewAggregator, Timeline, VersionEntry, parse_feedback};
use crate::store::{Phase, Role, RunStatus, RuntimeState};

const MAX_WIDTH: usize = 100;
const FEEDBACK_PREVIEW_CHARS: usize = 100;
const MAPPING_PREVIEW: usize = 5;
const SAMPLE_PREVIEW: usize = 5;

fn content_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| usize::from(w).saturating_sub(4))
        .unwrap_or(MAX_WIDTH)
        .clamp(40, MAX_WIDTH)
}

fn indent(text: &str, prefix: &str) -> String {
    let options = textwrap::Options::new(content_width())
        .initial_indent(prefix)
        .subsequent_indent(prefix);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                textwrap::fill(line, &options)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Local wall-clock time of an orchestrator timestamp, or the raw value when it
/// does not parse.
pub fn format_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_rfc2822(timestamp))
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// `text` cut to the first 100 characters, with `...` when anything was dropped.
pub fn truncate_feedback(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(FEEDBACK_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// One-line run status: runtime state (Pending when unknown) and phase label.
pub fn status_badge(status: Option<&RunStatus>, phase: Option<Phase>) -> String {
    let runtime = status.and_then(|s| s.runtime_status);
    let label = runtime.map_or("Pending", |s| s.as_str());
    let badge = match runtime {
        Some(RuntimeState::Running) => style(label).blue().bold(),
        Some(RuntimeState::Completed) => style(label).green().bold(),
        Some(RuntimeState::Failed | RuntimeState::Terminated) => style(label).red().bold(),
        Some(RuntimeState::Pending) | None => style(label).yellow().bold(),
        Some(RuntimeState::Other) => style(label).dim().bold(),
    };
    match phase {
        Some(phase) => format!("{} {}", badge, style(phase.label()).dim()),
        None => badge.to_string(),
    }
}

/// One transcript entry. Plan-bearing messages show their summary instead of raw JSON.
pub fn message(view: &MessageView<'_>) -> String {
    let msg = view.message;
    let (icon, author) = match msg.role {
        Role::Agent => (icons::AGENT, style("Agent").cyan().bold()),
        Role::Auditor => (icons::AUDITOR, style("You").magenta().bold()),
    };
    let header = format!(
        "{}{} {}",
        icon,
        author,
        style(format_time(&msg.timestamp)).dim()
    );

    let body = match &view.plan {
        Some(plan) => format!(
            "{}\n\n({} transformation steps, see the review panel)",
            plan.summary,
            plan.steps.len()
        ),
        None => msg.content.clone(),
    };
    format!("{}\n{}", header, indent(&body, "  "))
}

pub fn transcript(views: &[MessageView<'_>]) -> String {
    if views.is_empty() {
        return style("No messages yet").dim().to_string();
    }
    views.iter().map(message).collect::<Vec<_>>().join("\n\n")
}

fn step_icon(kind: &StepKind) -> console::Emoji<'static, 'static> {
    match kind {
        StepKind::FieldMapping { .. } => icons::MAPPING,
        StepKind::LookupJoin { .. } => icons::LOOKUP,
        StepKind::BusinessRule { .. } => icons::RULE,
        StepKind::Filter { .. } => icons::FILTER,
        StepKind::Calculation { .. } => icons::CALCULATION,
        StepKind::Output { .. } => icons::OUTPUT,
        StepKind::Unknown { .. } => icons::UNKNOWN,
    }
}

fn mapping_row(mapping: &FieldMapping) -> String {
    let transform = match &mapping.formula {
        Some(formula) if !formula.is_empty() => {
            format!("{} ({})", mapping.transform.as_str(), formula)
        }
        _ => mapping.transform.as_str().to_string(),
    };
    format!(
        "{} → {}  {}",
        mapping.source,
        style(&mapping.target).cyan(),
        style(transform).dim()
    )
}

fn step_body(step: &Step) -> Vec<String> {
    match &step.kind {
        StepKind::FieldMapping { mappings } => {
            // Short tables are shown whole rather than hiding one or two rows.
            let shown = if mappings.len() <= MAPPING_PREVIEW + 2 {
                mappings.len()
            } else {
                MAPPING_PREVIEW
            };
            let mut lines: Vec<String> = mappings[..shown].iter().map(mapping_row).collect();
            if shown < mappings.len() {
                lines.push(
                    style(format!("... and {} more mappings", mappings.len() - shown))
                        .dim()
                        .to_string(),
                );
            }
            lines
        }
        StepKind::LookupJoin {
            join_key,
            output_field,
            filter,
            sample_mappings,
        } => {
            let mut lines = vec![
                format!("Join: {} = {}", join_key.source, join_key.lookup),
                format!("Output: {}", style(output_field).cyan()),
            ];
            if let Some(filter) = filter.as_deref().filter(|f| !f.is_empty()) {
                lines.push(format!("Filter: {}", filter));
            }
            if !sample_mappings.is_empty() {
                lines.push("Sample mappings from your data:".to_string());
                lines.extend(
                    sample_mappings
                        .iter()
                        .take(SAMPLE_PREVIEW)
                        .map(|m| format!("  {} → {}", m.from, m.to)),
                );
            }
            lines
        }
        StepKind::BusinessRule { rules } => rules
            .iter()
            .map(|r| format!("• IF {} → {}", r.condition, style(&r.action).cyan()))
            .collect(),
        StepKind::Filter { condition, exclude } => {
            let verb = if *exclude {
                "Exclude rows where:"
            } else {
                "Include rows where:"
            };
            vec![format!("{} {}", verb, condition)]
        }
        StepKind::Calculation {
            output_field,
            formula,
        } => vec![
            format!("Output field: {}", style(output_field).cyan()),
            format!("Formula: {}", formula),
        ],
        StepKind::Output {
            format,
            destination,
        } => vec![
            format!("Format: {}", format),
            format!("Destination: {}", destination),
        ],
        StepKind::Unknown { .. } => {
            if step.description.is_some() {
                Vec::new()
            } else {
                vec![style("No details available").dim().to_string()]
            }
        }
    }
}

/// A single step card, with the reviewer's pending comment if there is one.
pub fn step_card(step: &Step, comment: Option<&str>) -> String {
    let mut header = format!(
        "{} {}{} {}",
        style(format!("[{}]", step.id)).blue().bold(),
        step_icon(&step.kind),
        style(&step.title).bold(),
        style(step.kind.label()).dim()
    );
    if comment.is_some() {
        header.push_str(&format!(" {}", style("Has feedback").yellow()));
    }

    let mut lines = vec![header];
    if let Some(description) = step.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(indent(description, "    "));
    }
    lines.extend(step_body(step).iter().map(|l| indent(l, "    ")));
    if let Some(comment) = comment {
        lines.push(indent(&format!("{}{}", icons::COMMENT, comment), "    "));
    }
    lines.join("\n")
}

pub fn stats_line(plan: &StructuredPlan) -> String {
    let stats = plan.stats();
    format!(
        "{} field mappings · {} lookups · {} business rules",
        stats.field_mappings, stats.lookups, stats.business_rules
    )
}

/// The plan review surface: summary, counts and every step card.
pub fn plan_review(plan: &StructuredPlan, comments: &StepReviewAggregator) -> String {
    let title = match plan.version {
        Some(v) => format!("Transformation Plan v{}", v),
        None => "Transformation Plan".to_string(),
    };
    let mut sections = vec![
        style(title).bold().underlined().to_string(),
        indent(&plan.summary, ""),
        style(stats_line(plan)).dim().to_string(),
    ];
    sections.extend(
        plan.steps
            .iter()
            .map(|step| step_card(step, comments.comment(&step.id))),
    );
    sections.join("\n\n")
}

/// Review surface for pseudocode that did not decode as a plan.
pub fn raw_plan(content: &str) -> String {
    format!(
        "{}\n\n{}",
        style("Pseudocode (unstructured)").bold().underlined(),
        indent(&fallback_text(content), "  ")
    )
}

fn version_line(entry: &VersionEntry, current: bool) -> String {
    let mut label = format!("v{}", entry.version);
    if current {
        label.push_str(" (current)");
    } else if entry.is_initial {
        label.push_str(" (initial)");
    }
    let label = if current {
        style(label).blue().bold().to_string()
    } else {
        label
    };
    format!("{} {}", label, style(format_time(&entry.timestamp)).dim())
}

pub fn version_history(timeline: &Timeline) -> String {
    let current = timeline.current();
    let mut lines = vec![
        format!(
            "{}Version History ({} versions)",
            icons::HISTORY,
            timeline.len()
        ),
        format!("  {}", version_line(current, true)),
    ];
    if let Some(feedback) = &current.feedback_before {
        lines.push(format!(
            "    Changes based on: \"{}\"",
            truncate_feedback(feedback)
        ));
    }
    lines.extend(
        timeline
            .previous()
            .map(|entry| format!("  {}", version_line(entry, false))),
    );
    lines.join("\n")
}

/// Reviewer feedback behind each revision, split into general text and step comments.
pub fn revision_feedback(timeline: &Timeline) -> Option<String> {
    let mut lines = Vec::new();
    for entry in timeline.entries() {
        let Some(text) = &entry.feedback_before else {
            continue;
        };
        let parsed = parse_feedback(text);
        lines.push(format!("  {}", style(format!("v{}", entry.version)).bold()));
        if !parsed.general.is_empty() {
            lines.extend(parsed.general.lines().map(|line| format!("    {}", line)));
        }
        for comment in &parsed.step_comments {
            let mut comment_lines = comment.comment.lines();
            lines.push(format!(
                "    {}[Step {}] {}",
                icons::COMMENT,
                comment.step_id,
                comment_lines.next().unwrap_or_default()
            ));
            lines.extend(comment_lines.map(|line| format!("      {}", line)));
        }
    }
    if lines.is_empty() {
        return None;
    }
    lines.insert(0, "Feedback per revision:".to_string());
    Some(lines.join("\n"))
}

/// Step comments not yet sent.
pub fn pending_comments(comments: &StepReviewAggregator) -> String {
    if comments.is_empty() {
        return style("No step comments").dim().to_string();
    }
    comments
        .comments()
        .iter()
        .map(|c| format!("{}[Step {}] {}", icons::COMMENT, c.step_id, c.comment))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{annotate, decode_plan};
    use crate::store::Message;
    use serde_json::json;

    fn plain() {
        console::set_colors_enabled(false);
    }

    fn sample_plan() -> StructuredPlan {
        let content = json!({
            "version": 2,
            "summary": "Map MAF transactions to the ledger",
            "steps": [
                {"id": 1, "type": "field_mapping", "title": "Map columns", "mappings": [
                    {"source": "TXN_ID", "target": "transaction_id", "transform": "direct"},
                    {"source": "AMT", "target": "amount", "transform": "formula", "formula": "AMT * 100"}
                ]},
                {"id": 2, "type": "lookup_join", "title": "Fund names",
                 "join_key": {"source": "FUND", "lookup": "code"}, "output_field": "fund_name",
                 "sample_mappings": [{"from": "F01", "to": "Growth"}]},
                {"id": 3, "type": "business_rule", "title": "Signs", "rules": [
                    {"condition": "type == 'R'", "action": "negate amount"},
                    {"condition": "amount == 0", "action": "drop"}
                ]},
                {"id": 4, "type": "filter", "title": "Drop tests", "condition": "is_test", "exclude": true},
                {"id": 5, "type": "mystery", "title": "Something new"}
            ]
        })
        .to_string();
        decode_plan(&content).unwrap()
    }

    #[test]
    fn truncates_long_feedback_at_100_chars() {
        let long = "x".repeat(150);
        let cut = truncate_feedback(&long);
        assert_eq!(cut.len(), 103);
        assert!(cut.ends_with("..."));

        let exact = "y".repeat(100);
        assert_eq!(truncate_feedback(&exact), exact);
        assert_eq!(truncate_feedback("short"), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(120);
        let cut = truncate_feedback(&text);
        assert_eq!(cut.chars().count(), 103);
    }

    #[test]
    fn unparseable_time_is_shown_raw() {
        assert_eq!(format_time("yesterday"), "yesterday");
        let t = format_time("2025-01-01T12:30:00Z");
        assert_eq!(t.len(), 8);
        assert_eq!(t.matches(':').count(), 2);
    }

    #[test]
    fn status_badge_defaults_to_pending() {
        plain();
        assert_eq!(status_badge(None, None), "Pending");
        let line = status_badge(None, Some(Phase::OutputReview));
        assert!(line.contains("Output Review"));
    }

    #[test]
    fn plan_review_shows_stats_and_steps() {
        plain();
        let plan = sample_plan();
        let mut comments = StepReviewAggregator::new();
        comments.set_comment("2", "join on ISIN");

        let out = plan_review(&plan, &comments);
        assert!(out.contains("Transformation Plan v2"));
        assert!(out.contains("2 field mappings · 1 lookups · 2 business rules"));
        assert!(out.contains("Join: FUND = code"));
        assert!(out.contains("F01 → Growth"));
        assert!(out.contains("Exclude rows where: is_test"));
        assert!(out.contains("No details available"));
        assert!(out.contains("join on ISIN"));
        assert!(out.contains("Has feedback"));
    }

    #[test]
    fn long_mapping_tables_are_collapsed() {
        plain();
        let mappings: Vec<_> = (0..9)
            .map(|i| json!({"source": format!("S{}", i), "target": format!("t{}", i), "transform": "rename"}))
            .collect();
        let content = json!({"steps": [{"id": "m", "type": "field_mapping", "title": "Many", "mappings": mappings}]});
        let plan = decode_plan(&content.to_string()).unwrap();
        let card = step_card(&plan.steps[0], None);
        assert!(card.contains("S4 → t4"));
        assert!(!card.contains("S5 → t5"));
        assert!(card.contains("... and 4 more mappings"));
    }

    #[test]
    fn transcript_summarises_plans() {
        plain();
        let messages = vec![
            Message {
                id: "1".into(),
                thread_id: "t".into(),
                client_id: "MAF".into(),
                role: Role::Agent,
                content: json!({"summary": "Two steps", "steps": [
                    {"id": "a", "type": "calculation", "title": "x", "output_field": "x", "formula": "1"},
                    {"id": "b", "type": "calculation", "title": "y", "output_field": "y", "formula": "2"}
                ]})
                .to_string(),
                phase: Phase::PseudocodeReview,
                timestamp: "2025-01-01T00:00:00Z".into(),
            },
            Message {
                id: "2".into(),
                thread_id: "t".into(),
                client_id: "MAF".into(),
                role: Role::Auditor,
                content: "[Step a]: wrong".into(),
                phase: Phase::PseudocodeReview,
                timestamp: "not a time".into(),
            },
        ];
        let out = transcript(&annotate(&messages));
        assert!(out.contains("Two steps"));
        assert!(out.contains("(2 transformation steps"));
        assert!(!out.contains("\"steps\""));
        assert!(out.contains("You not a time"));
        assert!(out.contains("[Step a]: wrong"));
    }

    #[test]
    fn version_history_marks_current_and_initial() {
        plain();
        let entries = vec![
            VersionEntry {
                version: 1,
                timestamp: "2025-01-01T00:00:00Z".into(),
                message_id: "1".into(),
                is_initial: true,
                feedback_before: None,
            },
            VersionEntry {
                version: 2,
                timestamp: "2025-01-01T00:05:00Z".into(),
                message_id: "3".into(),
                is_initial: false,
                feedback_before: Some("z".repeat(120)),
            },
        ];
        let out = version_history(&Timeline::from_entries(entries).unwrap());
        assert!(out.contains("Version History (2 versions)"));
        assert!(out.contains("v2 (current)"));
        assert!(out.contains("v1 (initial)"));
        assert!(out.contains(&format!("\"{}...\"", "z".repeat(100))));
    }

    #[test]
    fn raw_plan_shows_legacy_text_instead_of_json() {
        plain();
        let out = raw_plan(
            r#"{"version":1,"summary":"Map MAF","steps":[],"raw_text":"1. map A to B"}"#,
        );
        assert!(out.starts_with("Pseudocode (unstructured)"));
        assert!(out.contains("  1. map A to B"));
        assert!(!out.contains("\"steps\""));

        let out = raw_plan("Map A to B, then filter nulls");
        assert!(out.contains("  Map A to B, then filter nulls"));
    }

    #[test]
    fn revision_feedback_splits_step_comments() {
        plain();
        let entry = |version: u32, feedback: Option<&str>| VersionEntry {
            version,
            timestamp: "2025-01-01T00:00:00Z".into(),
            message_id: version.to_string(),
            is_initial: version == 1,
            feedback_before: feedback.map(str::to_string),
        };
        let timeline = Timeline::from_entries(vec![
            entry(1, None),
            entry(2, Some("Use the ledger.\n\n[Step 2]: wrong formula")),
        ])
        .unwrap();

        let out = revision_feedback(&timeline).unwrap();
        assert!(out.starts_with("Feedback per revision:"));
        assert!(out.contains("v2"));
        assert!(out.contains("    Use the ledger."));
        assert!(out.contains("[Step 2] wrong formula"));
        assert!(!out.contains("v1"));
    }

    #[test]
    fn revision_feedback_absent_without_reviewer_messages() {
        let entries = (1..=2)
            .map(|version| VersionEntry {
                version,
                timestamp: "2025-01-01T00:00:00Z".into(),
                message_id: version.to_string(),
                is_initial: version == 1,
                feedback_before: None,
            })
            .collect();
        assert!(revision_feedback(&Timeline::from_entries(entries).unwrap()).is_none());
    }
}
