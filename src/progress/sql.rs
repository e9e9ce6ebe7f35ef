//! Run state in a libsql table, shared across processes using the same database file

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, params};

use super::{RunStateStore, RunToken, StateError};

/// Durable run state backed by the `run_state` table
#[derive(Clone)]
pub struct SqlRunState {
    conn: Connection,
}

impl SqlRunState {
    /// Create the table if needed and wrap the connection
    pub async fn new(conn: Connection) -> Result<Self, StateError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS run_state (
                token TEXT PRIMARY KEY,
                percent INTEGER NOT NULL DEFAULT 0,
                stop_requested INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )",
            params![],
        )
        .await
        .map_err(|e| StateError::Schema(format!("Failed to create run_state table: {}", e)))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_run_state_updated ON run_state(updated_at)",
            params![],
        )
        .await
        .map_err(|e| StateError::Schema(format!("Failed to create run_state index: {}", e)))?;
        Ok(Self { conn })
    }

    async fn read_column(&self, token: &RunToken, column: &str) -> Result<i64, StateError> {
        let sql = format!("SELECT {column} FROM run_state WHERE token = ?");
        let mut rows = self.conn.query(&sql, params![token.as_str()]).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl RunStateStore for SqlRunState {
    async fn set_progress(&self, token: &RunToken, percent: u8) -> Result<(), StateError> {
        self.conn
            .execute(
                "INSERT INTO run_state (token, percent, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(token) DO UPDATE SET
                    percent = MAX(run_state.percent, excluded.percent),
                    updated_at = excluded.updated_at",
                params![token.as_str(), percent.min(100) as i64, Utc::now().timestamp()],
            )
            .await?;
        Ok(())
    }

    async fn progress(&self, token: &RunToken) -> Result<u8, StateError> {
        Ok(self.read_column(token, "percent").await?.clamp(0, 100) as u8)
    }

    async fn request_stop(&self, token: &RunToken) -> Result<(), StateError> {
        self.conn
            .execute(
                "INSERT INTO run_state (token, stop_requested, updated_at) VALUES (?1, 1, ?2)
                 ON CONFLICT(token) DO UPDATE SET
                    stop_requested = 1,
                    updated_at = excluded.updated_at",
                params![token.as_str(), Utc::now().timestamp()],
            )
            .await?;
        Ok(())
    }

    async fn stop_requested(&self, token: &RunToken) -> Result<bool, StateError> {
        Ok(self.read_column(token, "stop_requested").await? != 0)
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StateError> {
        let max_idle = i64::try_from(max_idle.as_secs()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp().saturating_sub(max_idle);
        let evicted = self
            .conn
            .execute("DELETE FROM run_state WHERE updated_at < ?1", params![cutoff])
            .await?;
        Ok(evicted as usize)
    }
}
