//! Schema migrations for the book cache.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its bookkeeping row, so a
//! failed migration leaves the schema at the previous version.

use super::{Error, to_sql_timestamp};
use tokio_rusqlite::{Connection, params};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// In apply order. The ledger comes first because both later tables reference it.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "search_queries",
        sql: include_str!("../../migrations/001_search_queries.sql"),
    },
    Migration { version: 2, name: "cached_books", sql: include_str!("../../migrations/002_cached_books.sql") },
    Migration {
        version: 3,
        name: "search_results",
        sql: include_str!("../../migrations/003_search_results.sql"),
    },
];

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the version whose SQL failed, or a
/// database error for the bookkeeping statements.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name)))?;
            tx.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, to_sql_timestamp(chrono::Utc::now())],
            )?;
            tx.commit()?;

            tracing::info!(version = migration.version, name = migration.name, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
