//! # Knowledge Schema Module
//!
//! One `knowledge` table. `source_url` is UNIQUE, so a page can only ever map
//! to one record; entries typed in by hand have no URL and are keyed by title
//! through a partial unique index. Both keys back the single-statement upsert
//! in `Database::upsert`.

use crate::knowledge::error::StoreError;
use libsql::{Connection, params};

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS knowledge (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL,
            source_url TEXT UNIQUE,
            category TEXT NOT NULL,
            author TEXT,
            language TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            embedding BLOB,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create knowledge table: {}", e)))?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_knowledge_manual_title
         ON knowledge(title) WHERE source_url IS NULL",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create manual title index: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_knowledge_active ON knowledge(is_active)",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create active index: {}", e)))?;

    Ok(())
}
