//! Database access used by the orchestrator.
//!
//! Each orchestrator operation opens its own session through a
//! [`DatabaseConnector`] and closes it when done; nothing is pooled.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor};

use crate::config::ConnectionConfig;

#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Opens a fresh session.
    async fn connect(&self) -> Result<Box<dyn DatabaseSession>>;
}

#[async_trait]
pub trait DatabaseSession: Send {
    /// Runs one statement, discarding any rows.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Returns `SELECT COUNT(*)` for `table`.
    async fn count_rows(&mut self, table: &str) -> Result<i64>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Connects to MySQL with `sqlx`.
pub struct MySqlConnector {
    config: ConnectionConfig,
}

impl MySqlConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }
}

#[async_trait]
impl DatabaseConnector for MySqlConnector {
    async fn connect(&self) -> Result<Box<dyn DatabaseSession>> {
        let conn = MySqlConnection::connect_with(&self.connect_options())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {} on {}:{}",
                    self.config.database, self.config.host, self.config.port
                )
            })?;
        Ok(Box::new(MySqlSession { conn }))
    }
}

struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        // A bare &str goes over the text protocol, so DDL that MySQL refuses
        // to prepare still runs.
        self.conn.execute(sql).await?;
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut self.conn)
            .await
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.context("Failed to close database connection")
    }
}
