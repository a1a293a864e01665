//! User directory query functions.

use rusqlite::Connection;

use qtm_types::affiliate::UserRecord;

use crate::{DbError, Result};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        wallet: row.get(0)?,
        referral_code: row.get(1)?,
        sponsor_wallet: row.get(2)?,
        created_at: row.get::<_, i64>(3)? as u64,
    })
}

/// Insert a new user. Fails with a constraint violation on duplicate
/// wallet or duplicate referral code; callers treat that as the
/// authoritative collision signal, not as a hard error.
pub fn insert(
    conn: &Connection,
    wallet: &str,
    referral_code: &str,
    sponsor_wallet: Option<&str>,
    created_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO users (wallet, referral_code, sponsor_wallet, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![wallet, referral_code, sponsor_wallet, created_at as i64],
    )?;
    Ok(())
}

/// Get a user by wallet.
pub fn get(conn: &Connection, wallet: &str) -> Result<UserRecord> {
    conn.query_row(
        "SELECT wallet, referral_code, sponsor_wallet, created_at
         FROM users WHERE wallet = ?1",
        [wallet],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("user {wallet}")),
        other => DbError::Sqlite(other),
    })
}

/// Get a user by wallet, if present.
pub fn get_opt(conn: &Connection, wallet: &str) -> Result<Option<UserRecord>> {
    match get(conn, wallet) {
        Ok(user) => Ok(Some(user)),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolve a referral code to its owner, if the code exists.
pub fn find_by_code(conn: &Connection, referral_code: &str) -> Result<Option<UserRecord>> {
    match conn.query_row(
        "SELECT wallet, referral_code, sponsor_wallet, created_at
         FROM users WHERE referral_code = ?1",
        [referral_code],
        row_to_user,
    ) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::Sqlite(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        insert(&conn, "wallet1", "QTMAB2CD", None, 100).expect("insert");

        let user = get(&conn, "wallet1").expect("get");
        assert_eq!(user.wallet, "wallet1");
        assert_eq!(user.referral_code, "QTMAB2CD");
        assert_eq!(user.sponsor_wallet, None);
        assert_eq!(user.created_at, 100);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let conn = test_db();
        let err = get(&conn, "nobody").expect_err("missing user");
        assert!(matches!(err, DbError::NotFound(_)));
        assert_eq!(get_opt(&conn, "nobody").expect("opt"), None);
    }

    #[test]
    fn test_sponsor_link_persisted() {
        let conn = test_db();
        insert(&conn, "sponsor", "QTMAAAAA", None, 100).expect("insert");
        insert(&conn, "child", "QTMBBBBB", Some("sponsor"), 101).expect("insert");

        let child = get(&conn, "child").expect("get");
        assert_eq!(child.sponsor_wallet.as_deref(), Some("sponsor"));
    }

    #[test]
    fn test_find_by_code() {
        let conn = test_db();
        insert(&conn, "wallet1", "QTMAB2CD", None, 100).expect("insert");

        let user = find_by_code(&conn, "QTMAB2CD").expect("query").expect("found");
        assert_eq!(user.wallet, "wallet1");
        assert!(find_by_code(&conn, "UNKNOWN").expect("query").is_none());
    }

    #[test]
    fn test_duplicate_wallet_is_constraint_violation() {
        let conn = test_db();
        insert(&conn, "wallet1", "QTMAAAAA", None, 100).expect("insert");
        let err = insert(&conn, "wallet1", "QTMBBBBB", None, 101).expect_err("duplicate");
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_duplicate_code_is_constraint_violation() {
        let conn = test_db();
        insert(&conn, "wallet1", "QTMAAAAA", None, 100).expect("insert");
        let err = insert(&conn, "wallet2", "QTMAAAAA", None, 101).expect_err("duplicate");
        assert!(err.is_constraint_violation());
    }
}
