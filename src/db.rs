//! SQLite pool helpers
//!
//! All handlers share one `SqlitePool`; the database is the only shared
//! mutable state in the process. WAL mode and foreign keys are enabled on
//! every production connection.

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::queries::ddl;

/// Current UTC time as stored in created_at/updated_at columns.
/// Fixed-width RFC 3339 so lexicographic string order matches time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Open a file-based database pool for production use, creating the file if
/// it does not exist yet
pub async fn open_database(db_path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Create all tables and indexes
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(&ddl::create_stories_table()).execute(pool).await?;
    sqlx::query(&ddl::create_chapters_table()).execute(pool).await?;
    sqlx::query(&ddl::create_history_table()).execute(pool).await?;

    sqlx::query(&ddl::create_chapters_story_order_index())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_history_unique_index())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_history_user_updated_index())
        .execute(pool)
        .await?;

    Ok(())
}

/// Create an in-memory database pool for testing
///
/// Capped at one connection: every sqlite in-memory connection is its own
/// database, so a larger pool would hand out empty databases.
pub async fn create_test_connection_in_memory() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory database");

    init_database_schema(&pool)
        .await
        .expect("Failed to initialize test schema");

    pool
}
