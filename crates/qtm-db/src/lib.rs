//! # qtm-db
//!
//! Database access layer for the presale backend.
//! Manages the single SQLite database at `$QTM_DATA_DIR/presale.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Unique constraints are the authoritative concurrency guard: referral
//! codes and the `(event_id, beneficiary, level)` ledger key are enforced
//! here, not by check-then-write sequences in application code.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Whether the underlying SQLite error is a uniqueness/constraint
    /// violation. Callers use this to distinguish expected races (duplicate
    /// wallet, duplicate referral code) from real failures.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DbError::Constraint(_) => true,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the presale database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_constraint_violation_detection() {
        let conn = open_memory().expect("open");
        conn.execute(
            "INSERT INTO users (wallet, referral_code, created_at) VALUES ('w1', 'QTMAAAAA', 1)",
            [],
        )
        .expect("first insert");

        let err = conn
            .execute(
                "INSERT INTO users (wallet, referral_code, created_at) VALUES ('w2', 'QTMAAAAA', 1)",
                [],
            )
            .map_err(DbError::Sqlite)
            .expect_err("duplicate code must fail");
        assert!(err.is_constraint_violation());
    }
}
