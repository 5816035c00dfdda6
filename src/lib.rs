//! Keeps a MySQL database's schema in step with a git repository and
//! snapshots the database back into it.
//!
//! [`sync::SyncOrchestrator`] runs the individual steps; [`scheduler::Scheduler`]
//! fires them on timers.

pub mod backup;
pub mod config;
pub mod db;
pub mod errors;
pub mod scheduler;
pub mod sync;
pub mod utils;
pub mod vcs;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConnectionConfig, SyncSettings};
pub use errors::AppError;
pub use scheduler::Scheduler;
pub use sync::{SyncOrchestrator, SyncOutcome};

use anyhow::Result;
use config::StartupConfig;

/// Loads `.env` and the connection config file, and wires the production
/// orchestrator.
pub fn orchestrator_from_env() -> Result<SyncOrchestrator> {
    orchestrator_from_startup(config::load_startup_config()?)
}

pub fn orchestrator_from_startup(startup: StartupConfig) -> Result<SyncOrchestrator> {
    tracing::debug!(
        path = %startup.config_path.display(),
        settings = ?startup.settings,
        connection = ?startup.connection,
        "Configuration loaded"
    );
    Ok(SyncOrchestrator::from_config(startup.settings, startup.connection))
}
