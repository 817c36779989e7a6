//! Database schema migrations for SQLite.
//!
//! Versioned migrations: each one transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: registrations table, append-only.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE registrations (
            digest BLOB PRIMARY KEY CHECK (length(digest) = 32),   -- SHA-256 of document bytes
            registrant BLOB NOT NULL CHECK (length(registrant) = 32), -- Ed25519 public key
            signature BLOB NOT NULL CHECK (length(signature) = 64),
            position INTEGER NOT NULL UNIQUE,                       -- 1-based insertion order
            registered_at INTEGER NOT NULL                          -- Unix ms
        );

        CREATE INDEX idx_registrations_registrant ON registrations(registrant, position);

        CREATE TRIGGER registrations_no_update
        BEFORE UPDATE ON registrations
        BEGIN
            SELECT RAISE(ABORT, 'registrations are append-only');
        END;

        CREATE TRIGGER registrations_no_delete
        BEFORE DELETE ON registrations
        BEGIN
            SELECT RAISE(ABORT, 'registrations are append-only');
        END;
        "#,
    )?;

    Ok(())
}

/// Migration v2: the id of the request that wrote each record.
///
/// Rows written before v2 get the all-zero id, which no live request carries.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE registrations
            ADD COLUMN request_id BLOB NOT NULL
            DEFAULT X'00000000000000000000000000000000'
            CHECK (length(request_id) = 16);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"registrations".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }

    #[test]
    fn test_v1_rows_survive_v2() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL)",
            [],
        )
        .unwrap();
        apply_v1(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations VALUES (1, 0)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO registrations (digest, registrant, signature, position, registered_at)
             VALUES (?1, ?2, ?3, 1, 0)",
            rusqlite::params![[0xaau8; 32].as_slice(), [1u8; 32].as_slice(), [2u8; 64].as_slice()],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let request_id: Vec<u8> = conn
            .query_row("SELECT request_id FROM registrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(request_id, vec![0u8; 16]);
    }

    #[test]
    fn test_rows_cannot_be_changed() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO registrations (digest, registrant, signature, position, registered_at)
             VALUES (?1, ?2, ?3, 1, 0)",
            rusqlite::params![[0xaau8; 32].as_slice(), [1u8; 32].as_slice(), [2u8; 64].as_slice()],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE registrations SET registered_at = 5", [])
            .is_err());
        assert!(conn.execute("DELETE FROM registrations", []).is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
