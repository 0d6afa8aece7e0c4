use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use auditor::config::{AuditorConfig, CliOverrides};
use auditor::logging::{LogConfig, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "auditor")]
#[command(version, about = "Human review console for AI-driven data transformation runs")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of .auditor/auditor.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Orchestrator base URL, e.g. http://localhost:7071/api
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Refresh interval while watching a run
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new transformation run
    Start {
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        mapping_path: Option<String>,
        #[arg(long)]
        data_path: Option<String>,
    },
    /// Show runtime state and current phase of a run
    Status { instance_id: String },
    /// Print the conversation log of a run
    Messages {
        instance_id: String,
        /// Print the raw message list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the plan revision history of a run
    History { instance_id: String },
    /// Follow a run until it completes or fails
    Watch { instance_id: String },
    /// Review a run interactively
    Review { instance_id: String },
    /// Approve the plan or output under review
    Approve {
        instance_id: String,
        /// Approve even though step comments were given
        #[arg(long)]
        discard_comments: bool,
        /// Step comment that will be discarded, as STEP=TEXT
        #[arg(long = "comment", value_name = "STEP=TEXT")]
        comments: Vec<String>,
    },
    /// Request changes to the plan or output under review
    Reject {
        instance_id: String,
        /// General feedback for the agent
        #[arg(short, long)]
        feedback: Option<String>,
        /// Comment on one step, as STEP=TEXT (repeatable)
        #[arg(long = "comment", value_name = "STEP=TEXT")]
        comments: Vec<String>,
    },
    /// Answer an agent question outside the review phases
    Reply { instance_id: String, text: String },
    /// View or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration
    Validate,
    /// Write a default .auditor/auditor.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            api_url: self.api_url.clone(),
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let work_dir = std::env::current_dir().context("Failed to get current directory")?;

    // Config commands inspect the file themselves and must work when it is invalid.
    if let Commands::Config { command } = &cli.command {
        let _guard = init_logging(LogConfig {
            level: "info".to_string(),
            verbose: cli.verbose,
            dir: None,
        })?;
        return cmd::cmd_config(&work_dir, cli.config.as_deref(), &cli.overrides(), command.clone());
    }

    let config = AuditorConfig::load(&work_dir, cli.config.as_deref(), &cli.overrides())?;
    let _guard = init_logging(LogConfig {
        level: config.logging.level.clone(),
        verbose: cli.verbose,
        dir: config.logging.dir.clone(),
    })?;
    let ctx = cmd::Context::new(config)?;

    match &cli.command {
        Commands::Start {
            client_id,
            mapping_path,
            data_path,
        } => {
            cmd::cmd_start(&ctx, client_id.clone(), mapping_path.clone(), data_path.clone())
                .await?
        }
        Commands::Status { instance_id } => cmd::cmd_status(&ctx, instance_id).await?,
        Commands::Messages { instance_id, json } => {
            cmd::cmd_messages(&ctx, instance_id, *json).await?
        }
        Commands::History { instance_id } => cmd::cmd_history(&ctx, instance_id).await?,
        Commands::Watch { instance_id } => cmd::cmd_watch(&ctx, instance_id).await?,
        Commands::Review { instance_id } => cmd::cmd_review(&ctx, instance_id).await?,
        Commands::Approve {
            instance_id,
            discard_comments,
            comments,
        } => cmd::cmd_approve(&ctx, instance_id, comments, *discard_comments).await?,
        Commands::Reject {
            instance_id,
            feedback,
            comments,
        } => cmd::cmd_reject(&ctx, instance_id, feedback.as_deref(), comments).await?,
        Commands::Reply { instance_id, text } => cmd::cmd_reply(&ctx, instance_id, text).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
