//! Flattening of step comments into the single feedback string the backend accepts.
//!
//! Each comment becomes a line `[Step <id>]: <comment>`. Lines are joined with
//! `\n`. General feedback, when present, comes first followed by a blank line:
//!
//! ```text
//! Please revisit the lookups.
//!
//! [Step 2]: wrong formula
//! [Step 4]: join on fund code, not name
//! ```

use regex::Regex;
use std::sync::LazyLock;

use super::aggregator::StepComment;

// The id runs to the first `]: `, so ids may contain `]` but not `]: `.
static STEP_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[Step (.*?)\]: (.*)$").unwrap());

const BLOCK_SEPARATOR: &str = "\n\n";

fn step_line(comment: &StepComment) -> String {
    format!("[Step {}]: {}", comment.step_id, comment.comment)
}

/// Render general feedback and step comments as one string, preserving comment order.
pub fn flatten(general: &str, comments: &[StepComment]) -> String {
    let block = comments
        .iter()
        .map(step_line)
        .collect::<Vec<_>>()
        .join("\n");

    match (general.is_empty(), block.is_empty()) {
        (_, true) => general.to_string(),
        (true, false) => block,
        (false, false) => format!("{}{}{}", general, BLOCK_SEPARATOR, block),
    }
}

/// Feedback string split back into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeedback {
    pub general: String,
    pub step_comments: Vec<StepComment>,
}

/// Inverse of [`flatten`].
///
/// The step block starts either at the beginning of the text or right after the
/// first blank line that is followed by a `[Step ...]:` line. Lines inside the
/// block that do not start a new step are continuation lines of the previous
/// comment.
pub fn parse(text: &str) -> ParsedFeedback {
    let (general, block) = split_block(text);

    let mut step_comments: Vec<StepComment> = Vec::new();
    for line in block.lines() {
        if let Some(cap) = STEP_LINE_REGEX.captures(line) {
            step_comments.push(StepComment {
                step_id: cap[1].to_string(),
                comment: cap[2].to_string(),
            });
        } else if let Some(last) = step_comments.last_mut() {
            last.comment.push('\n');
            last.comment.push_str(line);
        }
    }

    ParsedFeedback {
        general: general.to_string(),
        step_comments,
    }
}

fn split_block(text: &str) -> (&str, &str) {
    if starts_with_step_line(text) {
        return ("", text);
    }
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(BLOCK_SEPARATOR) {
        let sep = search_from + offset;
        let rest = &text[sep + BLOCK_SEPARATOR.len()..];
        if starts_with_step_line(rest) {
            return (&text[..sep], rest);
        }
        search_from = sep + 1;
    }
    (text, "")
}

fn starts_with_step_line(text: &str) -> bool {
    text.lines()
        .next()
        .is_some_and(|first| STEP_LINE_REGEX.is_match(first))
}
