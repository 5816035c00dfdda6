// dbsync/src/sync/logic.rs
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backup::{DumpClient, MySqlDump, backup_commit_message, backup_file_name};
use crate::config::{ConnectionConfig, SyncSettings};
use crate::db::{DatabaseConnector, DatabaseSession, MySqlConnector};
use crate::errors::AppError;
use crate::sync::statements::{is_already_exists, is_data_mutation, split_statements};
use crate::utils::databases::TRACKED_TABLES;
use crate::utils::preview;
use crate::vcs::{CommitOutcome, GitCli, VcsClient};

const SCHEMA_EXTENSION: &str = ".sql";

/// Counts from one schema apply run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub executed: usize,
    pub skipped_data: usize,
    pub suppressed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pull failed; nothing else ran.
    Aborted,
    Completed { backup: PathBuf, published: bool },
}

/// Drives pull, schema apply, export and publish against one database and
/// one tracked repository.
pub struct SyncOrchestrator {
    settings: SyncSettings,
    connection: ConnectionConfig,
    database: Arc<dyn DatabaseConnector>,
    vcs: Arc<dyn VcsClient>,
    dump: Arc<dyn DumpClient>,
}

impl SyncOrchestrator {
    pub fn new(
        settings: SyncSettings,
        connection: ConnectionConfig,
        database: Arc<dyn DatabaseConnector>,
        vcs: Arc<dyn VcsClient>,
        dump: Arc<dyn DumpClient>,
    ) -> Self {
        Self {
            settings,
            connection,
            database,
            vcs,
            dump,
        }
    }

    /// Wires the production clients: MySQL through sqlx, `git`, `mysqldump`.
    pub fn from_config(settings: SyncSettings, connection: ConnectionConfig) -> Self {
        let database = Arc::new(MySqlConnector::new(connection.clone()));
        Self::new(settings, connection, database, Arc::new(GitCli::new()), Arc::new(MySqlDump::new()))
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Clones the remote when the tracked directory is missing, pulls it
    /// otherwise. Failures are logged and reported as `false`.
    pub async fn pull_latest_from_remote(&self) -> bool {
        info!(repo = %self.settings.remote_repo, "Pulling latest database schema from remote...");
        match self.try_pull().await {
            Ok(()) => {
                info!("✓ Successfully pulled latest changes from remote");
                true
            }
            Err(e) => {
                error!(error = format!("{:#}", e), "Error pulling from remote");
                false
            }
        }
    }

    async fn try_pull(&self) -> Result<()> {
        let dir = &self.settings.tracked_dir;
        if !dir.exists() {
            info!(dir = %dir.display(), "Tracked directory missing, cloning");
            self.vcs.clone_repo(&self.settings.remote_url, dir).await
        } else {
            self.vcs.pull(dir, &self.settings.branch).await
        }
    }

    /// Returns the last `.sql` file in the tracked directory's listing order.
    pub async fn locate_latest_schema_file(&self) -> Result<PathBuf> {
        let dir = &self.settings.tracked_dir;
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list tracked directory: {}", dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let latest = select_latest_schema(names).ok_or_else(|| AppError::NoSchemaFile(dir.clone()))?;
        Ok(dir.join(latest))
    }

    /// Applies the latest schema file, reporting success as a boolean.
    pub async fn apply_schema(&self) -> bool {
        match self.apply_schema_report().await {
            Ok(report) => {
                info!(
                    executed = report.executed,
                    skipped_data = report.skipped_data,
                    already_present = report.suppressed,
                    failed = report.failed,
                    "Database schema sync completed"
                );
                true
            }
            Err(e) => {
                error!(error = format!("{:#}", e), "Error syncing database schema");
                false
            }
        }
    }

    /// Same as [`apply_schema`](Self::apply_schema) but returns the counts.
    ///
    /// Statement errors never abort the run; only connecting, locating or
    /// reading the schema file do.
    pub async fn apply_schema_report(&self) -> Result<ApplyReport> {
        let mut session = self.database.connect().await?;
        let result = self.apply_with_session(session.as_mut()).await;
        if let Err(e) = session.close().await {
            warn!(error = format!("{:#}", e), "Failed to close database connection");
        }
        result
    }

    async fn apply_with_session(&self, session: &mut dyn DatabaseSession) -> Result<ApplyReport> {
        let schema_file = self.locate_latest_schema_file().await?;
        let sql = tokio::fs::read_to_string(&schema_file)
            .await
            .with_context(|| format!("Failed to read schema file: {}", schema_file.display()))?;

        info!(file = %schema_file.display(), "Applying database schema updates...");

        let mut report = ApplyReport::default();
        for statement in split_statements(&sql) {
            if is_data_mutation(statement) {
                report.skipped_data += 1;
                continue;
            }
            match session.execute(statement).await {
                Ok(()) => report.executed += 1,
                Err(e) if is_already_exists(&e) => {
                    debug!(statement = %preview(statement, 100), "Object already exists");
                    report.suppressed += 1;
                }
                Err(e) => {
                    error!(
                        statement = %preview(statement, 100),
                        error = format!("{:#}", e),
                        "Error executing statement"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Dumps the database to `{backup_dir}/{prefix}_{timestamp}.sql`.
    ///
    /// Unlike the other operations a failure here is returned to the caller.
    pub async fn export_to_file(&self) -> Result<PathBuf> {
        let backup_dir = &self.settings.backup_dir;
        let filepath = backup_dir.join(backup_file_name(&self.settings.backup_prefix, Utc::now()));

        tokio::fs::create_dir_all(backup_dir)
            .await
            .with_context(|| format!("Failed to create backup directory: {}", backup_dir.display()))?;

        info!("Exporting database to file...");
        if let Err(e) = self.dump.dump(&self.connection, &filepath).await {
            error!(error = format!("{:#}", e), "Error exporting database");
            return Err(e);
        }

        info!(path = %filepath.display(), "✓ Database exported");
        Ok(filepath)
    }

    /// Copies `filepath` into the tracked directory, then commits and pushes
    /// it. Returns `true` only when a commit was pushed.
    pub async fn publish_to_remote(&self, filepath: &Path) -> bool {
        info!(file = %filepath.display(), "Pushing backup to remote...");
        match self.try_publish(filepath).await {
            Ok(CommitOutcome::Committed) => {
                info!("✓ Successfully pushed backup to remote");
                true
            }
            Ok(CommitOutcome::NothingToCommit) => {
                warn!(file = %filepath.display(), "Nothing to commit, backup already published");
                false
            }
            Err(e) => {
                error!(error = format!("{:#}", e), "Error pushing to remote");
                false
            }
        }
    }

    async fn try_publish(&self, filepath: &Path) -> Result<CommitOutcome> {
        let file_name = filepath
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid backup file path: {}", filepath.display()))?;
        let dir = &self.settings.tracked_dir;
        let target = dir.join(file_name);

        tokio::fs::copy(filepath, &target)
            .await
            .with_context(|| format!("Failed to copy {} to {}", filepath.display(), target.display()))?;

        self.vcs.add(dir, file_name).await?;
        let outcome = self.vcs.commit(dir, &backup_commit_message(Utc::now())).await?;
        if outcome == CommitOutcome::Committed {
            self.vcs.push(dir, &self.settings.branch).await?;
        }
        Ok(outcome)
    }

    /// Logs the row count of every tracked table. Read-only.
    pub async fn sync_tracked_tables(&self) -> Vec<TableRowCount> {
        let mut session = match self.database.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = format!("{:#}", e), "Error syncing tables");
                return Vec::new();
            }
        };

        info!("Syncing table data...");
        let mut counts = Vec::new();
        for table in TRACKED_TABLES {
            debug!(table, "Syncing table");
            match session.count_rows(table).await {
                Ok(rows) => {
                    info!(table, rows, "{}: {} records", table, rows);
                    counts.push(TableRowCount {
                        table: table.to_string(),
                        rows,
                    });
                }
                Err(e) => error!(table, error = format!("{:#}", e), "Error syncing table"),
            }
        }

        if let Err(e) = session.close().await {
            warn!(error = format!("{:#}", e), "Failed to close database connection");
        }
        info!("Table data sync completed");
        counts
    }

    /// pull → apply → table sync → export → publish.
    ///
    /// Stops early only when the pull fails. Apply, table sync and publish
    /// failures are logged and the sequence continues; an export failure is
    /// returned.
    pub async fn full_sync(&self) -> Result<SyncOutcome> {
        info!("🔄 Starting full database sync...");

        if !self.pull_latest_from_remote().await {
            error!("Failed to pull from remote, aborting sync");
            return Ok(SyncOutcome::Aborted);
        }

        self.apply_schema().await;
        self.sync_tracked_tables().await;

        let backup = self.export_to_file().await?;
        let published = self.publish_to_remote(&backup).await;

        info!(backup = %backup.display(), published, "✅ Full sync completed");
        Ok(SyncOutcome::Completed { backup, published })
    }

    /// Export followed by publish.
    pub async fn export_and_publish(&self) -> Result<bool> {
        let backup = self.export_to_file().await?;
        Ok(self.publish_to_remote(&backup).await)
    }
}

/// Picks the last name ending in `.sql`, in the order given.
///
/// The order is whatever the directory listing produced; no sorting by name
/// or modification time happens here.
pub fn select_latest_schema<I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    names.into_iter().filter(|name| name.ends_with(SCHEMA_EXTENSION)).last()
}
