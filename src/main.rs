//! Database Schema Sync Tool
//!
//! One-shot CLI: pull the schema repository, back up and publish, or run the
//! full sync.

use anyhow::{Context, Result};
use dbsync::{SyncOutcome, orchestrator_from_env, utils::logging::init_logging};
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "Usage: dbsync [pull|push|sync]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pull,
    Push,
    Sync,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.map(str::trim) {
            Some("pull") => Some(Command::Pull),
            Some("push") => Some(Command::Push),
            Some("sync") => Some(Command::Sync),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("❌ Error: {:?}", e);
        return ExitCode::FAILURE;
    }

    match run_app().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{:#}", e), "❌ Operation failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let arg = env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        println!("{}", USAGE);
        return Ok(());
    };

    let orchestrator = orchestrator_from_env().context("Failed to load configuration")?;

    match command {
        Command::Pull => {
            orchestrator.pull_latest_from_remote().await;
        }
        Command::Push => {
            orchestrator
                .export_and_publish()
                .await
                .context("Backup export failed")?;
        }
        Command::Sync => match orchestrator.full_sync().await.context("Full sync failed")? {
            SyncOutcome::Aborted => info!("Sync aborted"),
            SyncOutcome::Completed { backup, published } => {
                info!(backup = %backup.display(), published, "Sync finished")
            }
        },
    }
    Ok(())
}
