pub mod databases;
pub mod logging;

use anyhow::Result;
use std::path::PathBuf;
use which::which;

use crate::errors::AppError;

/// Finds `program` in the system PATH.
pub fn find_executable(program: &str) -> Result<PathBuf> {
    which(program).map_err(|_| {
        AppError::ExecutableNotFound {
            program: program.to_string(),
        }
        .into()
    })
}

/// Shortens a statement for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
