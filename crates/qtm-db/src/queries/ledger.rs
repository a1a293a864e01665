//! Commission ledger query functions.
//!
//! Entries are immutable apart from the forward-only status transition
//! driven by the external settlement process.

use rusqlite::Connection;

use qtm_types::affiliate::{AffiliateEventType, CommissionEntry, CommissionStatus};

use crate::{DbError, Result};

/// Per-status amount sums for one beneficiary/level slice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusTotals {
    pub total: f64,
    pub pending: f64,
    pub confirmed: f64,
    pub paid: f64,
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommissionEntry> {
    let event_type: String = row.get(6)?;
    let status: String = row.get(8)?;
    Ok(CommissionEntry {
        id: row.get(0)?,
        source_wallet: row.get(1)?,
        beneficiary_wallet: row.get(2)?,
        level: row.get::<_, u8>(3)?,
        percentage: row.get(4)?,
        amount: row.get(5)?,
        event_type: AffiliateEventType::parse(&event_type),
        event_id: row.get(7)?,
        status: CommissionStatus::parse(&status).unwrap_or(CommissionStatus::Pending),
        created_at: row.get::<_, i64>(9)? as u64,
    })
}

const ENTRY_COLUMNS: &str = "id, source_wallet, beneficiary_wallet, level, percentage, \
     amount, event_type, event_id, status, created_at";

/// Insert a commission entry keyed by `(event_id, beneficiary, level)`.
///
/// Returns `true` if the row was written, `false` if an entry with the
/// same key already existed (idempotent redelivery; the unique constraint
/// is the enforcement point, not an application-level lock).
pub fn insert_commission(conn: &Connection, entry: &CommissionEntry) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO commissions
         (id, source_wallet, beneficiary_wallet, level, percentage, amount,
          event_type, event_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            entry.id,
            entry.source_wallet,
            entry.beneficiary_wallet,
            entry.level,
            entry.percentage,
            entry.amount,
            entry.event_type.as_str(),
            entry.event_id,
            entry.status.as_str(),
            entry.created_at as i64,
        ],
    )?;
    Ok(changed > 0)
}

/// Get one ledger entry by id.
pub fn get(conn: &Connection, id: &str) -> Result<CommissionEntry> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM commissions WHERE id = ?1"),
        [id],
        row_to_entry,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("commission {id}")),
        other => DbError::Sqlite(other),
    })
}

/// Commission history for a beneficiary, newest first.
pub fn history(
    conn: &Connection,
    beneficiary: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<CommissionEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM commissions
         WHERE beneficiary_wallet = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![beneficiary, limit, offset], row_to_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Total number of ledger entries for a beneficiary.
pub fn history_count(conn: &Connection, beneficiary: &str) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM commissions WHERE beneficiary_wallet = ?1",
        [beneficiary],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Level-scoped ledger entries for a beneficiary, newest first.
pub fn level_transactions(
    conn: &Connection,
    beneficiary: &str,
    level: u8,
    limit: u32,
    offset: u32,
) -> Result<Vec<CommissionEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM commissions
         WHERE beneficiary_wallet = ?1 AND level = ?2
         ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
    ))?;

    let rows = stmt
        .query_map(
            rusqlite::params![beneficiary, level, limit, offset],
            row_to_entry,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Count and amount sum for one beneficiary/level slice.
pub fn level_summary(conn: &Connection, beneficiary: &str, level: u8) -> Result<(u32, f64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount), 0)
         FROM commissions WHERE beneficiary_wallet = ?1 AND level = ?2",
        rusqlite::params![beneficiary, level],
        |row| Ok((row.get::<_, i64>(0)? as u32, row.get(1)?)),
    )
    .map_err(DbError::Sqlite)
}

/// Amount sums partitioned by status for one beneficiary/level slice.
pub fn status_totals(conn: &Connection, beneficiary: &str, level: u8) -> Result<StatusTotals> {
    conn.query_row(
        "SELECT
             COALESCE(SUM(amount), 0),
             COALESCE(SUM(CASE WHEN status = 'pending' THEN amount END), 0),
             COALESCE(SUM(CASE WHEN status = 'confirmed' THEN amount END), 0),
             COALESCE(SUM(CASE WHEN status = 'paid' THEN amount END), 0)
         FROM commissions WHERE beneficiary_wallet = ?1 AND level = ?2",
        rusqlite::params![beneficiary, level],
        |row| {
            Ok(StatusTotals {
                total: row.get(0)?,
                pending: row.get(1)?,
                confirmed: row.get(2)?,
                paid: row.get(3)?,
            })
        },
    )
    .map_err(DbError::Sqlite)
}

/// Sum of amounts generated by a source wallet's events (all levels).
pub fn source_total(conn: &Connection, source: &str) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM commissions WHERE source_wallet = ?1",
        [source],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Advance an entry's settlement status.
///
/// The progression is forward-only (pending -> confirmed -> paid);
/// regressions are rejected as invalid input.
pub fn update_status(conn: &Connection, id: &str, new_status: CommissionStatus) -> Result<()> {
    let current = get(conn, id)?.status;
    if !current.can_transition_to(new_status) {
        return Err(DbError::InvalidInput(format!(
            "cannot move commission {id} from {} to {}",
            current.as_str(),
            new_status.as_str()
        )));
    }

    conn.execute(
        "UPDATE commissions SET status = ?1 WHERE id = ?2",
        rusqlite::params![new_status.as_str(), id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtm_types::affiliate::AffiliateEventType;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn entry(id: &str, beneficiary: &str, level: u8, amount: f64, event_id: &str) -> CommissionEntry {
        CommissionEntry {
            id: id.to_string(),
            source_wallet: "buyer".to_string(),
            beneficiary_wallet: beneficiary.to_string(),
            level,
            percentage: 20.0,
            amount,
            event_type: AffiliateEventType::PresalePurchase,
            event_id: event_id.to_string(),
            status: CommissionStatus::Pending,
            created_at: 1_000,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        assert!(insert_commission(&conn, &entry("c1", "ben", 1, 20.0, "evt-1")).expect("insert"));

        let stored = get(&conn, "c1").expect("get");
        assert_eq!(stored.beneficiary_wallet, "ben");
        assert_eq!(stored.amount, 20.0);
        assert_eq!(stored.status, CommissionStatus::Pending);
    }

    #[test]
    fn test_duplicate_key_is_noop() {
        let conn = test_db();
        assert!(insert_commission(&conn, &entry("c1", "ben", 1, 20.0, "evt-1")).expect("insert"));
        // Same (event_id, beneficiary, level), different row id: skipped
        assert!(!insert_commission(&conn, &entry("c2", "ben", 1, 20.0, "evt-1")).expect("insert"));

        assert_eq!(history_count(&conn, "ben").expect("count"), 1);
    }

    #[test]
    fn test_same_event_different_levels_coexist() {
        let conn = test_db();
        assert!(insert_commission(&conn, &entry("c1", "ben1", 1, 20.0, "evt-1")).expect("insert"));
        assert!(insert_commission(&conn, &entry("c2", "ben2", 2, 10.0, "evt-1")).expect("insert"));
    }

    #[test]
    fn test_history_newest_first_with_pagination() {
        let conn = test_db();
        for i in 0..3 {
            let mut e = entry(&format!("c{i}"), "ben", 1, 10.0, &format!("evt-{i}"));
            e.created_at = 1_000 + i;
            insert_commission(&conn, &e).expect("insert");
        }

        let page = history(&conn, "ben", 2, 0).expect("history");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "c2");

        let rest = history(&conn, "ben", 2, 2).expect("history");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "c0");
    }

    #[test]
    fn test_status_totals_partition() {
        let conn = test_db();
        insert_commission(&conn, &entry("c1", "ben", 1, 100.0, "evt-1")).expect("insert");
        insert_commission(&conn, &entry("c2", "ben", 1, 50.0, "evt-2")).expect("insert");
        update_status(&conn, "c2", CommissionStatus::Confirmed).expect("confirm");

        let totals = status_totals(&conn, "ben", 1).expect("totals");
        assert_eq!(totals.total, 150.0);
        assert_eq!(totals.pending, 100.0);
        assert_eq!(totals.confirmed, 50.0);
        assert_eq!(totals.paid, 0.0);
    }

    #[test]
    fn test_status_regression_rejected() {
        let conn = test_db();
        insert_commission(&conn, &entry("c1", "ben", 1, 100.0, "evt-1")).expect("insert");
        update_status(&conn, "c1", CommissionStatus::Paid).expect("pay");

        let err = update_status(&conn, "c1", CommissionStatus::Pending).expect_err("regress");
        assert!(matches!(err, DbError::InvalidInput(_)));

        assert_eq!(get(&conn, "c1").expect("get").status, CommissionStatus::Paid);
    }

    #[test]
    fn test_update_status_unknown_id() {
        let conn = test_db();
        let err = update_status(&conn, "missing", CommissionStatus::Paid).expect_err("missing");
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_level_summary_and_source_total() {
        let conn = test_db();
        insert_commission(&conn, &entry("c1", "ben", 1, 100.0, "evt-1")).expect("insert");
        insert_commission(&conn, &entry("c2", "ben", 2, 50.0, "evt-2")).expect("insert");

        let (count, sum) = level_summary(&conn, "ben", 1).expect("summary");
        assert_eq!(count, 1);
        assert_eq!(sum, 100.0);

        assert_eq!(source_total(&conn, "buyer").expect("sum"), 150.0);
        assert_eq!(source_total(&conn, "nobody").expect("sum"), 0.0);
    }
}
