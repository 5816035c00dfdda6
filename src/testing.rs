//! In-memory stand-ins for MySQL, git and mysqldump.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveTime;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::backup::DumpClient;
use crate::config::{ConnectionConfig, SyncSettings};
use crate::db::{DatabaseConnector, DatabaseSession};
use crate::sync::SyncOrchestrator;
use crate::vcs::{CommitOutcome, VcsClient};

#[derive(Default)]
struct DatabaseState {
    attempted: Vec<String>,
    executed: Vec<String>,
    failures: Vec<(String, String)>,
    counts: HashMap<String, i64>,
    fail_connect: bool,
    connects: usize,
    closes: usize,
}

#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl FakeDatabase {
    /// Statements containing `needle` fail with `message`.
    pub fn fail_statements_containing(&self, needle: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((needle.to_string(), message.to_string()));
    }

    pub fn fail_connect(&self) {
        self.state.lock().unwrap().fail_connect = true;
    }

    pub fn set_count(&self, table: &str, rows: i64) {
        self.state.lock().unwrap().counts.insert(table.to_string(), rows);
    }

    /// Statements that ran without error.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Every statement submitted, failed or not.
    pub fn attempted(&self) -> Vec<String> {
        self.state.lock().unwrap().attempted.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl DatabaseConnector for FakeDatabase {
    async fn connect(&self) -> Result<Box<dyn DatabaseSession>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(anyhow!("Can't connect to MySQL server on 'localhost' (111)"));
        }
        state.connects += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<DatabaseState>>,
}

#[async_trait]
impl DatabaseSession for FakeSession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempted.push(sql.to_string());
        let failure = state
            .failures
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, message)| message.clone());
        match failure {
            Some(message) => Err(anyhow!("error returned from database: {}", message)),
            None => {
                state.executed.push(sql.to_string());
                Ok(())
            }
        }
    }

    async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let state = self.state.lock().unwrap();
        state
            .counts
            .get(table)
            .copied()
            .ok_or_else(|| anyhow!("Table 'stocks.{}' doesn't exist", table))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct VcsState {
    calls: Vec<String>,
    fail_on: HashSet<String>,
    nothing_to_commit: bool,
    last_message: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeVcs {
    state: Arc<Mutex<VcsState>>,
}

impl FakeVcs {
    /// Makes the named operation (`clone`, `pull`, `add`, `commit`, `push`) fail.
    pub fn fail_on(&self, operation: &str) {
        self.state.lock().unwrap().fail_on.insert(operation.to_string());
    }

    pub fn nothing_to_commit(&self) {
        self.state.lock().unwrap().nothing_to_commit = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.state.lock().unwrap().last_message.clone()
    }

    fn record(&self, operation: &str, call: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_on.contains(operation) {
            return Err(anyhow!("fatal: unable to {}", operation));
        }
        Ok(())
    }
}

#[async_trait]
impl VcsClient for FakeVcs {
    async fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        self.record("clone", format!("clone {}", url))?;
        fs::create_dir_all(dir)?;
        Ok(())
    }

    async fn pull(&self, _dir: &Path, branch: &str) -> Result<()> {
        self.record("pull", format!("pull {}", branch))
    }

    async fn add(&self, _dir: &Path, file: &str) -> Result<()> {
        self.record("add", format!("add {}", file))
    }

    async fn commit(&self, _dir: &Path, message: &str) -> Result<CommitOutcome> {
        self.record("commit", "commit".to_string())?;
        let mut state = self.state.lock().unwrap();
        if state.nothing_to_commit {
            return Ok(CommitOutcome::NothingToCommit);
        }
        state.last_message = Some(message.to_string());
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self, _dir: &Path, branch: &str) -> Result<()> {
        self.record("push", format!("push {}", branch))
    }
}

#[derive(Default)]
struct DumpState {
    dumps: usize,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct FakeDump {
    state: Arc<Mutex<DumpState>>,
}

impl FakeDump {
    pub fn fail(&self) {
        self.state.lock().unwrap().fail = true;
    }

    /// Number of successful dumps.
    pub fn dumps(&self) -> usize {
        self.state.lock().unwrap().dumps
    }
}

#[async_trait]
impl DumpClient for FakeDump {
    async fn dump(&self, connection: &ConnectionConfig, output_path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(anyhow!("mysqldump exited with status 2: Access denied for user"));
        }
        fs::write(output_path, format!("-- dump of {}\n", connection.database))?;
        state.dumps += 1;
        Ok(())
    }
}

/// An orchestrator over fakes, rooted in a scratch directory.
pub struct Fixture {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub database: FakeDatabase,
    pub vcs: FakeVcs,
    pub dump: FakeDump,
    root: TempDir,
}

impl Fixture {
    /// Tracked directory already present, as after a first clone.
    pub fn new() -> Result<Self> {
        let fixture = Self::without_tracked_dir()?;
        fs::create_dir_all(fixture.tracked_dir())?;
        Ok(fixture)
    }

    pub fn without_tracked_dir() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let settings = SyncSettings {
            remote_repo: "acme/sm-db-scripts".to_string(),
            remote_url: "https://github.com/acme/sm-db-scripts.git".to_string(),
            branch: "main".to_string(),
            tracked_dir: root.path().join("repo"),
            backup_dir: root.path().join("backups"),
            backup_prefix: "sm_db".to_string(),
            daily_sync_time: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        };
        let connection = ConnectionConfig {
            host: "localhost".to_string(),
            user: "sync".to_string(),
            password: "secret".to_string(),
            database: "stocks".to_string(),
            port: 3306,
        };

        let database = FakeDatabase::default();
        let vcs = FakeVcs::default();
        let dump = FakeDump::default();
        let orchestrator = SyncOrchestrator::new(
            settings,
            connection,
            Arc::new(database.clone()),
            Arc::new(vcs.clone()),
            Arc::new(dump.clone()),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            database,
            vcs,
            dump,
            root,
        })
    }

    pub fn tracked_dir(&self) -> PathBuf {
        self.root.path().join("repo")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.path().join("backups")
    }

    pub fn write_tracked(&self, name: &str, content: &str) -> Result<()> {
        fs::write(self.tracked_dir().join(name), content)?;
        Ok(())
    }
}
