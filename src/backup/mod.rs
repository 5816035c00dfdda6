pub(crate) mod db_dump;

pub use db_dump::{DumpClient, MySqlDump};

use chrono::{DateTime, Utc};

/// Backup artifact name: `{prefix}_{YYYYMMDDTHHMMSS}.sql`, UTC.
pub fn backup_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.sql", prefix, at.format("%Y%m%dT%H%M%S"))
}

/// Commit message used when a backup is published.
pub fn backup_commit_message(at: DateTime<Utc>) -> String {
    format!(
        "Automated database backup - {}",
        at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    )
}
