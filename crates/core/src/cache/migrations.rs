//! Page cache schema.
//!
//! Each migration runs inside its own transaction and is recorded in
//! `schema_migrations`, so a half-applied batch never counts as applied.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Applied in order, each exactly once.
const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, name: "pages", sql: include_str!("../../migrations/001_pages.sql") }];

fn applied_version(conn: &rusqlite::Connection) -> Result<u32, Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;
    let version: u32 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the schema up to date.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = applied_version(conn)?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tracing::debug!(version = migration.version, name = migration.name, "applying cache migration");
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {}", migration.name, migration.version, e)))?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}
