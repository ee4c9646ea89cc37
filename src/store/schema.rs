//! # Store Schema
//!
//! Every collection lives in one `records` table. A record is a JSON object
//! in `data`; `created_at`/`updated_at` mirror the timestamps inside it so
//! listings can be ordered without parsing JSON.

use libsql::{params, Connection};

use super::error::StoreError;

/// Create the tables and indexes if they do not exist
pub async fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create records table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_collection_created
            ON records(collection, created_at)",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create records index: {}", e)))?;

    Ok(())
}
