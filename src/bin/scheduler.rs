//! Long-running scheduler: daily full sync, hourly backup, schema refresh
//! every four hours. Stops on Ctrl-C.

use anyhow::{Context, Result};
use dbsync::{Scheduler, orchestrator_from_env, utils::logging::init_logging};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("❌ Error: {:?}", e);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{:#}", e), "❌ Scheduler failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let orchestrator = orchestrator_from_env().context("Failed to load configuration")?;
    let scheduler = Scheduler::new(Arc::new(orchestrator));
    scheduler.run_until_interrupted().await
}
