//! Database module for SQLite persistence.
//!
//! One SQLite file holds both layouts: the `documents` key/value table and the
//! normalized tracker tables. The configured backend decides which one is used.

mod documents;
mod relational;
mod store;

pub use documents::*;
pub use relational::*;
pub use store::*;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::StorageBackend;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Build the tracker store for the configured backend.
pub fn open_store(pool: SqlitePool, backend: StorageBackend) -> Arc<dyn TrackerStore> {
    match backend {
        StorageBackend::Documents => {
            Arc::new(DocumentRepository::new(SqliteDocumentStore::new(pool)))
        }
        StorageBackend::Relational => Arc::new(RelationalRepository::new(pool)),
    }
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Document backend
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT 'application/json',
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Relational backend
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            roster_updated_at TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT NOT NULL,
            team_id TEXT NOT NULL REFERENCES teams(id),
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            email TEXT,
            phone TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (team_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weeks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id TEXT NOT NULL REFERENCES teams(id),
            iso_week TEXT NOT NULL,
            schema_version INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL,
            UNIQUE (team_id, iso_week)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Member ids are not foreign keys: history outlives roster edits
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS member_week_state (
            week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
            member_id TEXT NOT NULL,
            weekly_focus_set INTEGER NOT NULL DEFAULT 0,
            roleplay_done INTEGER NOT NULL DEFAULT 0,
            first_meetings INTEGER NOT NULL DEFAULT 0,
            signed_recruits INTEGER NOT NULL DEFAULT 0,
            goals TEXT,
            notes TEXT NOT NULL DEFAULT '',
            custom_tasks TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL,
            UNIQUE (week_id, member_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roleplays (
            id TEXT NOT NULL,
            week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
            member_id TEXT NOT NULL,
            type TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (week_id, member_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_tasks (
            id TEXT NOT NULL,
            week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
            label TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (week_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS task_attendance (
            week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
            task_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            attended INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (week_id, task_id, member_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            team_id TEXT NOT NULL,
            iso_week TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            summary TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_members_team_position ON members(team_id, position);
        CREATE INDEX IF NOT EXISTS idx_weeks_team_week ON weeks(team_id, iso_week);
        CREATE INDEX IF NOT EXISTS idx_roleplays_week_member ON roleplays(week_id, member_id, position);
        CREATE INDEX IF NOT EXISTS idx_audit_team_week ON audit_events(team_id, iso_week, seq);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
