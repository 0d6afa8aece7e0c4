//! Read-only run commands and `auditor start`.

use anyhow::{Context as _, Result};
use console::style;
use tracing::info;

use super::Context;
use auditor::plan::annotate;
use auditor::review::{ReviewState, Timeline};
use auditor::store::StartTransformRequest;
use auditor::ui::icons::{CHECK, CROSS, WAITING};
use auditor::ui::render;

pub async fn cmd_start(
    ctx: &Context,
    client_id: Option<String>,
    mapping_path: Option<String>,
    data_path: Option<String>,
) -> Result<()> {
    let request =
        StartTransformRequest::with_defaults(client_id, mapping_path, data_path, &ctx.config.defaults);
    let response = ctx
        .store
        .start_transform(&request)
        .await
        .context("Failed to start transformation")?;

    info!(instance_id = %response.instance_id, client_id = %response.client_id, "run started");
    println!("{}Started run {}", CHECK, style(&response.instance_id).bold());
    println!(
        "  client: {}  mapping: {}  data: {}",
        request.client_id, request.mapping_path, request.data_path
    );
    println!();
    println!("Follow it with: auditor review {}", response.instance_id);
    Ok(())
}

pub async fn cmd_status(ctx: &Context, instance_id: &str) -> Result<()> {
    let mut session = ctx.session(instance_id);
    session
        .refresh()
        .await
        .with_context(|| format!("Failed to load run {}", instance_id))?;

    let view = session.view();
    let snapshot = view.snapshot();
    println!("{} {}", style(instance_id).bold(), render::status_badge(view.status(), snapshot.phase));

    if let Some(status) = view.status() {
        if let Some(created) = &status.created_time {
            println!("  created: {}", render::format_time(created));
        }
        if let Some(updated) = &status.last_updated_time {
            println!("  updated: {}", render::format_time(updated));
        }
    }
    println!("  messages: {}", view.messages().len());

    if session.controller().state() == ReviewState::AwaitingDecision {
        println!("{}Awaiting your review", WAITING);
    }
    Ok(())
}

pub async fn cmd_messages(ctx: &Context, instance_id: &str, json: bool) -> Result<()> {
    let messages = ctx
        .store
        .messages(instance_id)
        .await
        .with_context(|| format!("Failed to load messages for run {}", instance_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        println!("{}", render::transcript(&annotate(&messages)));
    }
    Ok(())
}

pub async fn cmd_history(ctx: &Context, instance_id: &str) -> Result<()> {
    let messages = ctx
        .store
        .messages(instance_id)
        .await
        .with_context(|| format!("Failed to load messages for run {}", instance_id))?;

    match Timeline::from_log(&messages) {
        Some(timeline) => {
            println!("{}", render::version_history(&timeline));
            if let Some(feedback) = render::revision_feedback(&timeline) {
                println!();
                println!("{}", feedback);
            }
        }
        None => println!("No revisions yet"),
    }
    Ok(())
}

/// Print the log as it grows until the run reaches a terminal state.
pub async fn cmd_watch(ctx: &Context, instance_id: &str) -> Result<()> {
    let mut session = ctx.session(instance_id);
    let (poller, mut rx) = session.poll(ctx.config.poll_interval());
    let mut printed = 0;
    let mut last_phase = None;
    let mut announced: Option<String> = None;

    println!("Watching {} (Ctrl-C to stop)", style(instance_id).bold());
    loop {
        let update = tokio::select! {
            update = rx.recv() => update,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(update) = update else {
            break;
        };
        if !session.apply_update(update) {
            continue;
        }

        let view = session.view();
        let messages = view.messages();
        // Never expected, but a shorter log means we cannot tell what is new.
        if messages.len() < printed {
            printed = 0;
        }
        for entry in annotate(&messages[printed..]) {
            println!("{}\n", render::message(&entry));
        }
        printed = messages.len();

        let phase = view.snapshot().phase;
        if phase != last_phase {
            println!("{}", render::status_badge(view.status(), phase));
            last_phase = phase;
        }

        if view.is_terminal() {
            let icon = if session.controller().state() == ReviewState::Completed {
                CHECK
            } else {
                CROSS
            };
            println!("{}{}", icon, render::status_badge(view.status(), phase));
            break;
        }

        let tail = messages.last().map(|m| m.id.clone());
        if session.controller().state() == ReviewState::AwaitingDecision && tail != announced {
            println!("{}Waiting for you: auditor review {}", WAITING, instance_id);
            announced = tail;
        }
    }

    poller.stop();
    Ok(())
}
