// dbsync/src/config/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveTime;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

pub const CONFIG_PATH_VAR: &str = "ENV_CONFIG_PATH";

const DEFAULT_BACKUP_DIR: &str = "./db-backups";
const DEFAULT_TRACKED_DIR: &str = "./sm-db-scripts";
const DEFAULT_BACKUP_PREFIX: &str = "sm_db";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_DAILY_SYNC_TIME: &str = "02:00";

/// MySQL connection parameters read from the `KEY=VALUE` config file.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

impl ConnectionConfig {
    /// Builds a connection config from parsed entries.
    ///
    /// Every recognized key must be present and `DB_PORT` must be a valid port;
    /// anything else is a fatal misconfiguration.
    pub fn from_entries(entries: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| AppError::Config(format!("{} must be set in the connection config file", key)).into())
        };

        let raw_port = required("DB_PORT")?;
        let port = raw_port.parse::<u16>().map_err(|_| {
            AppError::Config(format!("DB_PORT must be a valid port number, got '{}'", raw_port))
        })?;

        Ok(ConnectionConfig {
            host: required("DB_HOST")?,
            user: required("DB_U")?,
            password: required("DB_P")?,
            database: required("DB_NAME")?,
            port,
        })
    }
}

/// Splits `KEY=VALUE` lines on the first `=`. Lines without a key or a value
/// are skipped; a repeated key keeps its last value.
pub fn parse_entries(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        entries.insert(key.to_string(), value.to_string());
    }
    entries
}

/// Reads and parses the connection config file at `path`.
pub fn load_connection_config(path: &Path) -> Result<ConnectionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read connection config file at {}", path.display()))?;
    ConnectionConfig::from_entries(&parse_entries(&content))
        .with_context(|| format!("Invalid connection config in {}", path.display()))
}

/// Everything the binaries need before building an orchestrator.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub config_path: PathBuf,
    pub connection: ConnectionConfig,
    pub settings: SyncSettings,
}

/// Loads `.env` into the process environment, then resolves the startup
/// config from it.
pub fn load_startup_config() -> Result<StartupConfig> {
    dotenv::dotenv().ok();
    load_startup_config_with(|key| env::var(key).ok())
}

/// Resolves the startup config through `env_lookup`.
///
/// The file named by `ENV_CONFIG_PATH` is parsed once with [`parse_entries`]:
/// it supplies the connection keys, and also any settings key the
/// environment leaves unset. Malformed lines in it are skipped.
pub fn load_startup_config_with<F>(env_lookup: F) -> Result<StartupConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = env_lookup(CONFIG_PATH_VAR)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| AppError::Config(format!("{} must be set", CONFIG_PATH_VAR)))?;

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read connection config file at {}", config_path.display()))?;
    let entries = parse_entries(&content);

    let connection = ConnectionConfig::from_entries(&entries)
        .with_context(|| format!("Invalid connection config in {}", config_path.display()))?;
    let settings = SyncSettings::from_lookup(|key| env_lookup(key).or_else(|| entries.get(key).cloned()))
        .context("Failed to load sync settings")?;

    Ok(StartupConfig {
        config_path,
        connection,
        settings,
    })
}

/// Process-wide settings for the sync tool, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Remote repository as `owner/name`.
    pub remote_repo: String,
    pub remote_url: String,
    pub branch: String,
    pub tracked_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_prefix: String,
    pub daily_sync_time: NaiveTime,
}

impl SyncSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let remote_repo = get("GITHUB_REPO")
            .ok_or_else(|| AppError::Config("GITHUB_REPO must be set (owner/name)".to_string()))?;
        let slug = Regex::new(r"^[\w.-]+/[\w.-]+$").context("Invalid repository slug pattern")?;
        if !slug.is_match(&remote_repo) {
            return Err(AppError::Config(format!(
                "GITHUB_REPO must look like owner/name, got '{}'",
                remote_repo
            ))
            .into());
        }

        let remote_url = get("GITHUB_REMOTE_URL")
            .unwrap_or_else(|| format!("https://github.com/{}.git", remote_repo));

        let raw_time = get("DAILY_SYNC_TIME").unwrap_or_else(|| DEFAULT_DAILY_SYNC_TIME.to_string());
        let daily_sync_time = NaiveTime::parse_from_str(&raw_time, "%H:%M").map_err(|_| {
            AppError::Config(format!("DAILY_SYNC_TIME must be HH:MM, got '{}'", raw_time))
        })?;

        Ok(SyncSettings {
            remote_repo,
            remote_url,
            branch: get("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            tracked_dir: PathBuf::from(get("GITHUB_DIR").unwrap_or_else(|| DEFAULT_TRACKED_DIR.to_string())),
            backup_dir: PathBuf::from(get("BACKUP_DIR").unwrap_or_else(|| DEFAULT_BACKUP_DIR.to_string())),
            backup_prefix: get("BACKUP_PREFIX").unwrap_or_else(|| DEFAULT_BACKUP_PREFIX.to_string()),
            daily_sync_time,
        })
    }
}
