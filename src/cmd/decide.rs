//! One-shot review decisions: `auditor approve`, `auditor reject`, `auditor reply`.
//!
//! These go through the same controller as the interactive review, so the same
//! rules apply: nothing is sent unless the run is awaiting review, and an
//! empty change request is refused locally.

use anyhow::{Context as _, Result, bail};
use console::style;

use super::Context;
use auditor::errors::ReviewError;
use auditor::review::{Decision, ReviewMode, ReviewState};
use auditor::session::ReviewSession;
use auditor::ui::icons::CHECK;
use auditor::ui::render;

/// Split a `STEP=TEXT` argument.
fn parse_step_comment(arg: &str) -> Result<(String, String)> {
    let Some((step, text)) = arg.split_once('=') else {
        bail!("Invalid step comment '{}': expected STEP=TEXT", arg);
    };
    let step = step.trim();
    if step.is_empty() {
        bail!("Invalid step comment '{}': step id is empty", arg);
    }
    Ok((step.to_string(), text.trim().to_string()))
}

/// Load the run and make sure it is waiting on the reviewer.
async fn open_review(ctx: &Context, instance_id: &str) -> Result<ReviewSession> {
    let mut session = ctx.session(instance_id);
    session
        .refresh()
        .await
        .with_context(|| format!("Failed to load run {}", instance_id))?;

    if session.controller().state() != ReviewState::AwaitingDecision {
        let view = session.view();
        bail!(
            "Run {} is not awaiting review ({})",
            instance_id,
            console::strip_ansi_codes(&render::status_badge(view.status(), view.snapshot().phase))
        );
    }
    Ok(session)
}

fn add_step_comments(session: &mut ReviewSession, comments: &[String]) -> Result<()> {
    if comments.is_empty() {
        return Ok(());
    }
    let Some(plan) = session.view().pending_plan() else {
        bail!("Step comments need a structured plan under review");
    };
    for arg in comments {
        let (step, text) = parse_step_comment(arg)?;
        if plan.step(&step).is_none() {
            bail!("Plan has no step '{}'", step);
        }
        session.controller_mut().set_step_comment(&step, &text)?;
    }
    Ok(())
}

pub async fn cmd_approve(
    ctx: &Context,
    instance_id: &str,
    comments: &[String],
    discard_comments: bool,
) -> Result<()> {
    let mut session = open_review(ctx, instance_id).await?;
    add_step_comments(&mut session, comments)?;

    let submission = match session.controller_mut().approve()? {
        Decision::Submit(submission) => submission,
        Decision::ConfirmDiscard { pending_comments } => {
            match session.controller_mut().confirm_approval(discard_comments)? {
                Some(submission) => submission,
                None => bail!(
                    "Approving would discard {} step comment(s). Pass --discard-comments to approve anyway, or use `auditor reject`",
                    pending_comments
                ),
            }
        }
        Decision::Composing => bail!("Unexpected review state"),
    };

    session.submit(&submission).await?;
    println!("{}Approved run {}", CHECK, style(instance_id).bold());
    Ok(())
}

pub async fn cmd_reject(
    ctx: &Context,
    instance_id: &str,
    feedback: Option<&str>,
    comments: &[String],
) -> Result<()> {
    let mut session = open_review(ctx, instance_id).await?;
    if session.controller().mode() == Some(ReviewMode::FreeForm) {
        bail!("The agent asked a question; answer it with `auditor reply`");
    }

    session.controller_mut().request_changes()?;
    add_step_comments(&mut session, comments)?;
    if let Some(text) = feedback {
        session.controller_mut().set_general_feedback(text)?;
    }

    let submission = match session.controller_mut().request_changes() {
        Ok(Decision::Submit(submission)) => submission,
        Ok(_) => bail!("Unexpected review state"),
        Err(ReviewError::InvalidSubmission) => {
            bail!("Nothing to send: pass --feedback or at least one --comment")
        }
        Err(e) => return Err(e.into()),
    };

    session.submit(&submission).await?;
    println!(
        "{}Requested changes on run {} ({} step comment(s))",
        CHECK,
        style(instance_id).bold(),
        submission.step_comments.len()
    );
    Ok(())
}

pub async fn cmd_reply(ctx: &Context, instance_id: &str, text: &str) -> Result<()> {
    let mut session = open_review(ctx, instance_id).await?;

    let submission = match session.controller_mut().reply(text) {
        Ok(submission) => submission,
        Err(ReviewError::InvalidSubmission) => bail!("Reply text is empty"),
        Err(ReviewError::ActionUnavailable { .. }) => {
            bail!("The run is waiting on a review decision; use `auditor approve` or `auditor reject`")
        }
        Err(e) => return Err(e.into()),
    };

    session.submit(&submission).await?;
    println!("{}Reply sent to run {}", CHECK, style(instance_id).bold());
    Ok(())
}
