use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures that callers need to tell apart. Everything else travels as a
/// plain `anyhow::Error` with context attached.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No SQL schema file found in {}", .0.display())]
    NoSchemaFile(PathBuf),

    #[error("{program} not found in PATH. Please ensure it is installed and in your PATH.")]
    ExecutableNotFound { program: String },

    #[error("{program} {action} failed with status: {status}\nStdout: {stdout}\nStderr: {stderr}")]
    CommandFailed {
        program: String,
        action: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

impl AppError {
    /// Combined output of a failed command, for matching on tool messages.
    pub fn command_output(&self) -> Option<String> {
        match self {
            AppError::CommandFailed { stdout, stderr, .. } => Some(format!("{}\n{}", stdout, stderr)),
            _ => None,
        }
    }
}
