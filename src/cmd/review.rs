//! Interactive review loop: `auditor review <id>`.
//!
//! Polls the run in the background. While the agent works a spinner is shown;
//! once it waits on the reviewer the plan (or output, or question) is printed
//! and a menu offers the actions the controller allows in its current state.

use anyhow::{Context as _, Result};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use tokio::sync::mpsc;
use tracing::debug;

use super::Context;
use auditor::errors::ReviewError;
use auditor::plan::annotate;
use auditor::review::{Decision, ReviewMode, ReviewState, ReviewSubmission};
use auditor::session::{ReviewSession, RunUpdate};
use auditor::ui::WaitSpinner;
use auditor::ui::icons::{CHECK, CROSS, WARN};
use auditor::ui::render;

enum Action {
    Continue,
    Refresh,
    Submit(ReviewSubmission),
    Quit,
}

#[derive(Clone, Copy)]
enum MenuItem {
    Approve,
    RequestChanges,
    CommentOnStep,
    EditFeedback,
    SubmitChanges,
    CancelChanges,
    Reply,
    ShowAgain,
    Refresh,
    Quit,
}

impl MenuItem {
    fn label(&self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::RequestChanges => "Request changes",
            Self::CommentOnStep => "Comment on a step",
            Self::EditFeedback => "Edit general feedback",
            Self::SubmitChanges => "Submit change request",
            Self::CancelChanges => "Cancel",
            Self::Reply => "Reply",
            Self::ShowAgain => "Show again",
            Self::Refresh => "Refresh",
            Self::Quit => "Quit",
        }
    }
}

struct ReviewLoop {
    session: ReviewSession,
    /// Tail message the review surface was last printed for
    shown_for: Option<String>,
}

/// Run a dialoguer prompt on a blocking thread so polling keeps running.
/// Everything the prompt needs must be owned (`'static`).
async fn ask<F, R>(prompt: F) -> Result<R>
where
    F: FnOnce(&ColorfulTheme) -> dialoguer::Result<R> + Send + 'static,
    R: Send + 'static,
{
    let answer = tokio::task::spawn_blocking(move || prompt(&ColorfulTheme::default()))
        .await
        .context("Prompt task panicked")??;
    Ok(answer)
}

pub async fn cmd_review(ctx: &Context, instance_id: &str) -> Result<()> {
    let mut session = ctx.session(instance_id);
    session
        .refresh()
        .await
        .with_context(|| format!("Failed to load run {}", instance_id))?;

    let (poller, mut rx) = session.poll(ctx.config.poll_interval());
    let mut review = ReviewLoop {
        session,
        shown_for: None,
    };
    let result = review.run(&mut rx).await;
    poller.stop();
    result
}

impl ReviewLoop {
    async fn run(&mut self, rx: &mut mpsc::Receiver<RunUpdate>) -> Result<()> {
        let mut spinner: Option<WaitSpinner> = None;

        loop {
            while let Ok(update) = rx.try_recv() {
                self.session.apply_update(update);
            }

            if self.session.controller().state().is_terminal() {
                drop(spinner.take());
                self.print_outcome();
                return Ok(());
            }

            if self.session.controller().can_act() {
                drop(spinner.take());
                match self.prompt().await? {
                    Action::Continue => {}
                    Action::Refresh => self.refresh().await,
                    Action::Submit(submission) => self.submit(&submission).await,
                    Action::Quit => return Ok(()),
                }
                continue;
            }

            let waiting = spinner.get_or_insert_with(WaitSpinner::new);
            waiting.update(self.session.view().snapshot().phase);
            tokio::select! {
                update = rx.recv() => match update {
                    Some(update) => {
                        self.session.apply_update(update);
                    }
                    None => return Ok(()),
                },
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.session.refresh().await {
            debug!(error = %e, "manual refresh failed");
            println!("{}{}", WARN, style(format!("Refresh failed: {}", e)).yellow());
        }
    }

    async fn submit(&mut self, submission: &ReviewSubmission) {
        let done = if submission.approved {
            "Approved"
        } else if self.session.controller().mode() == Some(ReviewMode::FreeForm) {
            "Reply sent"
        } else {
            "Changes requested"
        };

        match self.session.submit(submission).await {
            Ok(_) => {
                println!("{}{}", CHECK, style(done).green().bold());
                self.shown_for = None;
                self.refresh().await;
            }
            Err(e) => {
                println!("{}{}", CROSS, style(format!("Submission failed: {}", e)).red());
                println!("  Your feedback was kept. Try again.");
            }
        }
    }

    async fn prompt(&mut self) -> Result<Action> {
        match self.session.controller().state() {
            ReviewState::AwaitingDecision => {
                let tail = self.session.view().messages().last().map(|m| m.id.clone());
                if self.shown_for != tail {
                    self.print_surface();
                    self.shown_for = tail;
                }
                self.decision_menu().await
            }
            ReviewState::Composing => self.compose_menu().await,
            ReviewState::ConfirmingApproval {
                pending_comments, ..
            } => {
                let question = format!(
                    "You have {} unsent step comment(s). Discard them and approve?",
                    pending_comments
                );
                let confirmed = ask(move |theme| {
                    Confirm::with_theme(theme)
                        .with_prompt(question)
                        .default(false)
                        .interact()
                })
                .await?;
                Ok(self
                    .session
                    .controller_mut()
                    .confirm_approval(confirmed)?
                    .map_or(Action::Continue, Action::Submit))
            }
            _ => Ok(Action::Continue),
        }
    }

    fn print_surface(&self) {
        let view = self.session.view();
        let controller = self.session.controller();
        let Some(tail) = view.messages().last() else {
            return;
        };

        println!();
        println!("{}", render::status_badge(view.status(), Some(tail.phase)));
        println!();
        match controller.mode() {
            Some(ReviewMode::Plan) => {
                if let Some(timeline) = view.timeline() {
                    println!("{}\n", render::version_history(&timeline));
                }
                if let Some(plan) = view.pending_plan() {
                    println!("{}", render::plan_review(&plan, controller.aggregator()));
                }
            }
            Some(ReviewMode::RawPlan) => println!("{}", render::raw_plan(&tail.content)),
            Some(ReviewMode::Output) => {
                println!("{}", style("Output ready for review").bold().underlined());
                println!();
                println!("{}", tail.content);
            }
            Some(ReviewMode::FreeForm) | None => {
                for entry in annotate(std::slice::from_ref(tail)) {
                    println!("{}", render::message(&entry));
                }
            }
        }
        println!();
    }

    async fn select(prompt: String, items: &[MenuItem]) -> Result<MenuItem> {
        let labels: Vec<&'static str> = items.iter().map(MenuItem::label).collect();
        let selection = ask(move |theme| {
            Select::with_theme(theme)
                .with_prompt(prompt)
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;
        Ok(items[selection])
    }

    async fn decision_menu(&mut self) -> Result<Action> {
        let items: &[MenuItem] = match self.session.controller().mode() {
            Some(ReviewMode::Plan) => &[
                MenuItem::Approve,
                MenuItem::RequestChanges,
                MenuItem::CommentOnStep,
                MenuItem::ShowAgain,
                MenuItem::Refresh,
                MenuItem::Quit,
            ],
            Some(ReviewMode::FreeForm) => &[
                MenuItem::Reply,
                MenuItem::ShowAgain,
                MenuItem::Refresh,
                MenuItem::Quit,
            ],
            _ => &[
                MenuItem::Approve,
                MenuItem::RequestChanges,
                MenuItem::ShowAgain,
                MenuItem::Refresh,
                MenuItem::Quit,
            ],
        };
        let pending = self.session.controller().aggregator().len();
        let prompt = if pending > 0 {
            format!("Your decision ({} step comment(s) pending)", pending)
        } else {
            "Your decision".to_string()
        };

        match Self::select(prompt, items).await? {
            MenuItem::Approve => self.approve(),
            MenuItem::RequestChanges => {
                self.session.controller_mut().request_changes()?;
                Ok(Action::Continue)
            }
            MenuItem::CommentOnStep => self.comment_on_step().await,
            MenuItem::Reply => self.reply().await,
            MenuItem::ShowAgain => {
                self.shown_for = None;
                Ok(Action::Continue)
            }
            MenuItem::Refresh => Ok(Action::Refresh),
            MenuItem::Quit => Ok(Action::Quit),
            MenuItem::EditFeedback | MenuItem::SubmitChanges | MenuItem::CancelChanges => {
                Ok(Action::Continue)
            }
        }
    }

    async fn compose_menu(&mut self) -> Result<Action> {
        let controller = self.session.controller();
        println!();
        println!("{}", style("Change request").bold());
        let draft = controller.general_feedback();
        if draft.trim().is_empty() {
            println!("  {}", style("No general feedback").dim());
        } else {
            println!("  {}", draft);
        }
        println!("{}", render::pending_comments(controller.aggregator()));
        println!();

        let items: &[MenuItem] = if controller.mode() == Some(ReviewMode::Plan) {
            &[
                MenuItem::EditFeedback,
                MenuItem::CommentOnStep,
                MenuItem::SubmitChanges,
                MenuItem::Approve,
                MenuItem::CancelChanges,
            ]
        } else {
            &[
                MenuItem::EditFeedback,
                MenuItem::SubmitChanges,
                MenuItem::Approve,
                MenuItem::CancelChanges,
            ]
        };

        match Self::select("Request changes".to_string(), items).await? {
            MenuItem::EditFeedback => {
                let draft = self.session.controller().general_feedback().to_string();
                let text: String = ask(move |theme| {
                    Input::with_theme(theme)
                        .with_prompt("Feedback for the agent")
                        .with_initial_text(draft)
                        .allow_empty(true)
                        .interact_text()
                })
                .await?;
                self.session.controller_mut().set_general_feedback(&text)?;
                Ok(Action::Continue)
            }
            MenuItem::CommentOnStep => self.comment_on_step().await,
            MenuItem::SubmitChanges => match self.session.controller_mut().request_changes() {
                Ok(Decision::Submit(submission)) => Ok(Action::Submit(submission)),
                Ok(_) => Ok(Action::Continue),
                Err(ReviewError::InvalidSubmission) => {
                    println!(
                        "{}{}",
                        WARN,
                        style("Add general feedback or a step comment first").yellow()
                    );
                    Ok(Action::Continue)
                }
                Err(e) => Err(e.into()),
            },
            MenuItem::Approve => self.approve(),
            MenuItem::CancelChanges => {
                self.session.controller_mut().cancel_composing()?;
                Ok(Action::Continue)
            }
            _ => Ok(Action::Continue),
        }
    }

    fn approve(&mut self) -> Result<Action> {
        match self.session.controller_mut().approve()? {
            Decision::Submit(submission) => Ok(Action::Submit(submission)),
            // Confirmation is asked on the next turn of the loop.
            Decision::ConfirmDiscard { .. } | Decision::Composing => Ok(Action::Continue),
        }
    }

    async fn comment_on_step(&mut self) -> Result<Action> {
        let Some(plan) = self.session.view().pending_plan() else {
            println!("{}No structured plan to comment on", WARN);
            return Ok(Action::Continue);
        };

        let aggregator = self.session.controller().aggregator();
        let labels: Vec<String> = plan
            .steps
            .iter()
            .map(|step| {
                let marker = if aggregator.comment(&step.id).is_some() {
                    " (commented)"
                } else {
                    ""
                };
                format!("[{}] {}{}", step.id, step.title, marker)
            })
            .collect();

        let selection = ask(move |theme| {
            Select::with_theme(theme)
                .with_prompt("Which step?")
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;
        let step = &plan.steps[selection];
        let existing = self
            .session
            .controller()
            .aggregator()
            .comment(&step.id)
            .unwrap_or("")
            .to_string();

        let question = format!("Comment on step {} (empty removes it)", step.id);
        let text: String = ask(move |theme| {
            Input::with_theme(theme)
                .with_prompt(question)
                .with_initial_text(existing)
                .allow_empty(true)
                .interact_text()
        })
        .await?;
        self.session
            .controller_mut()
            .set_step_comment(&step.id, text.trim())?;
        Ok(Action::Continue)
    }

    async fn reply(&mut self) -> Result<Action> {
        let text: String = ask(|theme| {
            Input::with_theme(theme)
                .with_prompt("Reply")
                .allow_empty(true)
                .interact_text()
        })
        .await?;
        match self.session.controller_mut().reply(&text) {
            Ok(submission) => Ok(Action::Submit(submission)),
            Err(ReviewError::InvalidSubmission) => {
                println!("{}{}", WARN, style("Reply is empty, nothing sent").yellow());
                Ok(Action::Continue)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn print_outcome(&self) {
        let view = self.session.view();
        let badge = render::status_badge(view.status(), view.snapshot().phase);
        if self.session.controller().state() == ReviewState::Completed {
            println!("{}Run completed {}", CHECK, badge);
            if let Some(output) = view.status().map(|s| &s.output).filter(|o| !o.is_null()) {
                println!();
                println!(
                    "{}",
                    serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
                );
            }
        } else {
            println!("{}Run failed {}", CROSS, badge);
        }
    }
}
