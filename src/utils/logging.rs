//! Logging setup shared by both binaries.

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. `RUST_LOG` controls the filter (default
/// `info`), `LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let subscriber = fmt::Subscriber::builder()
            .json()
            .with_env_filter(env_filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to install JSON log subscriber")?;
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to install log subscriber")?;
    }
    Ok(())
}
