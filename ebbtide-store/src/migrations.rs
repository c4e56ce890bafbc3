//! Schema bootstrap.
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so running against an
//! already-populated database is a no-op.

use sqlx::SqlitePool;

use crate::error::StoreResult;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS stix_objects (
        id TEXT NOT NULL,
        object_type TEXT NOT NULL,
        spec_version TEXT NOT NULL,
        version TEXT NOT NULL,
        data TEXT NOT NULL,
        PRIMARY KEY (id, version)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS collection_entries (
        collection_id TEXT NOT NULL,
        object_id TEXT NOT NULL,
        version TEXT NOT NULL,
        date_added TEXT NOT NULL,
        PRIMARY KEY (collection_id, object_id, version)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_collection_entries_window
        ON collection_entries (collection_id, date_added, object_id)"#,
];

/// Create the tables the store needs.
pub async fn run(pool: &SqlitePool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
