// dbsync/src/backup/db_dump.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::errors::AppError;
use crate::utils::find_executable;

/// Writes a full SQL dump of the configured database to a file.
#[async_trait]
pub trait DumpClient: Send + Sync {
    /// Dumps `connection`'s database into `output_path`. A failed dump is an
    /// error, never a partial success.
    async fn dump(&self, connection: &ConnectionConfig, output_path: &Path) -> Result<()>;
}

/// `mysqldump` with routines, triggers and a single consistent transaction.
#[derive(Debug, Default, Clone)]
pub struct MySqlDump;

impl MySqlDump {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DumpClient for MySqlDump {
    async fn dump(&self, connection: &ConnectionConfig, output_path: &Path) -> Result<()> {
        let mysqldump_path = find_executable("mysqldump")?;
        debug!(path = %mysqldump_path.display(), "Found mysqldump executable");

        let output_file = File::create(output_path)
            .with_context(|| format!("Failed to create dump file: {}", output_path.display()))?;

        info!(
            database = %connection.database,
            output = %output_path.display(),
            "Dumping database with mysqldump..."
        );
        let output = Command::new(&mysqldump_path)
            .env("MYSQL_PWD", &connection.password)
            .arg("-h")
            .arg(&connection.host)
            .arg("-P")
            .arg(connection.port.to_string())
            .arg("-u")
            .arg(&connection.user)
            .arg(&connection.database)
            .arg("--routines")
            .arg("--triggers")
            .arg("--single-transaction")
            .stdout(Stdio::from(output_file))
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute mysqldump for database: {}", connection.database))?
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for mysqldump of database: {}", connection.database))?;

        if !output.status.success() {
            return Err(AppError::CommandFailed {
                program: "mysqldump".to_string(),
                action: format!("dump of {}", connection.database),
                status: output.status,
                stdout: String::new(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(())
    }
}
