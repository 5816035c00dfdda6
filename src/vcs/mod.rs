// dbsync/src/vcs/mod.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::errors::AppError;
use crate::utils::find_executable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

/// The version-control operations the orchestrator relies on.
#[async_trait]
pub trait VcsClient: Send + Sync {
    async fn clone_repo(&self, url: &str, dir: &Path) -> Result<()>;
    async fn pull(&self, dir: &Path, branch: &str) -> Result<()>;
    async fn add(&self, dir: &Path, file: &str) -> Result<()>;
    async fn commit(&self, dir: &Path, message: &str) -> Result<CommitOutcome>;
    async fn push(&self, dir: &Path, branch: &str) -> Result<()>;
}

/// Runs the `git` executable.
#[derive(Debug, Default, Clone)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, dir: Option<&Path>, args: &[&str], action: &str) -> Result<std::process::Output> {
        let git_path: PathBuf = find_executable("git")?;
        let mut command = Command::new(&git_path);
        if let Some(dir) = dir {
            command.arg("-C").arg(dir);
        }
        command.args(args);
        debug!(?args, "Running git");

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute git for {}", action))?;

        if !output.status.success() {
            return Err(AppError::CommandFailed {
                program: "git".to_string(),
                action: action.to_string(),
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(output)
    }
}

#[async_trait]
impl VcsClient for GitCli {
    async fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        let dir_arg = dir.to_string_lossy();
        self.run(None, &["clone", url, &*dir_arg], "clone").await?;
        Ok(())
    }

    async fn pull(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(Some(dir), &["pull", "origin", branch], "pull").await?;
        Ok(())
    }

    async fn add(&self, dir: &Path, file: &str) -> Result<()> {
        self.run(Some(dir), &["add", file], "add").await?;
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<CommitOutcome> {
        match self.run(Some(dir), &["commit", "-m", message], "commit").await {
            Ok(_) => Ok(CommitOutcome::Committed),
            Err(e) if is_nothing_to_commit(&e) => Ok(CommitOutcome::NothingToCommit),
            Err(e) => Err(e),
        }
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(Some(dir), &["push", "origin", branch], "push").await?;
        Ok(())
    }
}

/// git exits non-zero when the index matches HEAD; recognize that case.
fn is_nothing_to_commit(err: &anyhow::Error) -> bool {
    err.downcast_ref::<AppError>()
        .and_then(AppError::command_output)
        .map(|output| output.contains("nothing to commit") || output.contains("nothing added to commit"))
        .unwrap_or(false)
}
