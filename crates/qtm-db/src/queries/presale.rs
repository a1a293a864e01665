//! Presale purchase and progress query functions.

use rusqlite::Connection;

use qtm_types::presale::{PaymentMethod, PurchaseRecord, PurchaseStatus};

use crate::{DbError, Result};

/// Raw presale progress counters (the `id = 1` singleton row).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresaleStateRow {
    pub total_raised: f64,
    pub goal: f64,
    pub participants: u32,
    pub is_active: bool,
}

fn row_to_purchase(row: &rusqlite::Row<'_>) -> rusqlite::Result<PurchaseRecord> {
    let method: String = row.get(4)?;
    let status: String = row.get(6)?;
    Ok(PurchaseRecord {
        purchase_id: row.get(0)?,
        wallet: row.get(1)?,
        token_amount: row.get(2)?,
        amount_usd: row.get(3)?,
        payment_method: PaymentMethod::parse(&method).unwrap_or(PaymentMethod::Crypto),
        referral_code: row.get(5)?,
        status: PurchaseStatus::parse(&status).unwrap_or(PurchaseStatus::Initiated),
        created_at: row.get::<_, i64>(7)? as u64,
    })
}

/// Insert a purchase record.
pub fn insert_purchase(conn: &Connection, purchase: &PurchaseRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO purchases
         (purchase_id, wallet, token_amount, amount_usd, payment_method,
          referral_code, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            purchase.purchase_id,
            purchase.wallet,
            purchase.token_amount,
            purchase.amount_usd,
            purchase.payment_method.as_str(),
            purchase.referral_code,
            purchase.status.as_str(),
            purchase.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a purchase by id.
pub fn get_purchase(conn: &Connection, purchase_id: &str) -> Result<PurchaseRecord> {
    conn.query_row(
        "SELECT purchase_id, wallet, token_amount, amount_usd, payment_method,
                referral_code, status, created_at
         FROM purchases WHERE purchase_id = ?1",
        [purchase_id],
        row_to_purchase,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("purchase {purchase_id}"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Move a purchase from `initiated` to the given terminal status.
///
/// The guarded UPDATE makes completion race-safe: a second confirmation of
/// the same purchase finds zero matching rows and fails.
pub fn finalize_purchase(
    conn: &Connection,
    purchase_id: &str,
    status: PurchaseStatus,
) -> Result<()> {
    if status == PurchaseStatus::Initiated {
        return Err(DbError::InvalidInput(
            "cannot finalize back to initiated".into(),
        ));
    }

    let updated = conn.execute(
        "UPDATE purchases SET status = ?1 WHERE purchase_id = ?2 AND status = 'initiated'",
        rusqlite::params![status.as_str(), purchase_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!(
            "purchase {purchase_id} not found or already finalized"
        )));
    }
    Ok(())
}

/// Read the progress counters.
pub fn state(conn: &Connection) -> Result<PresaleStateRow> {
    conn.query_row(
        "SELECT total_raised, goal, participants, is_active FROM presale_state WHERE id = 1",
        [],
        |row| {
            Ok(PresaleStateRow {
                total_raised: row.get(0)?,
                goal: row.get(1)?,
                participants: row.get(2)?,
                is_active: row.get(3)?,
            })
        },
    )
    .map_err(DbError::Sqlite)
}

/// Add a completed purchase to the counters.
pub fn increment_raised(conn: &Connection, amount_usd: f64) -> Result<()> {
    conn.execute(
        "UPDATE presale_state
         SET total_raised = total_raised + ?1, participants = participants + 1
         WHERE id = 1",
        [amount_usd],
    )?;
    Ok(())
}

/// Admin update of the progress counters. `None` fields are left untouched.
pub fn update_state(
    conn: &Connection,
    total_raised: Option<f64>,
    goal: Option<f64>,
    is_active: Option<bool>,
) -> Result<()> {
    conn.execute(
        "UPDATE presale_state SET
             total_raised = COALESCE(?1, total_raised),
             goal = COALESCE(?2, goal),
             is_active = COALESCE(?3, is_active)
         WHERE id = 1",
        rusqlite::params![total_raised, goal, is_active],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn purchase(id: &str) -> PurchaseRecord {
        PurchaseRecord {
            purchase_id: id.to_string(),
            wallet: "buyer".to_string(),
            token_amount: 200,
            amount_usd: 500.0,
            payment_method: PaymentMethod::Crypto,
            referral_code: Some("QTMAB2CD".to_string()),
            status: PurchaseStatus::Initiated,
            created_at: 1_000,
        }
    }

    #[test]
    fn test_insert_and_get_purchase() {
        let conn = test_db();
        insert_purchase(&conn, &purchase("p1")).expect("insert");

        let stored = get_purchase(&conn, "p1").expect("get");
        assert_eq!(stored.amount_usd, 500.0);
        assert_eq!(stored.status, PurchaseStatus::Initiated);
        assert_eq!(stored.referral_code.as_deref(), Some("QTMAB2CD"));
    }

    #[test]
    fn test_finalize_purchase_once() {
        let conn = test_db();
        insert_purchase(&conn, &purchase("p1")).expect("insert");

        finalize_purchase(&conn, "p1", PurchaseStatus::Completed).expect("complete");
        assert_eq!(
            get_purchase(&conn, "p1").expect("get").status,
            PurchaseStatus::Completed
        );

        // Second completion finds no initiated row
        let err = finalize_purchase(&conn, "p1", PurchaseStatus::Completed).expect_err("dup");
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_finalize_to_initiated_rejected() {
        let conn = test_db();
        insert_purchase(&conn, &purchase("p1")).expect("insert");
        assert!(finalize_purchase(&conn, "p1", PurchaseStatus::Initiated).is_err());
    }

    #[test]
    fn test_state_defaults() {
        let conn = test_db();
        let row = state(&conn).expect("state");
        assert_eq!(row.total_raised, 0.0);
        assert_eq!(row.goal, 2_000_000.0);
        assert_eq!(row.participants, 0);
        assert!(row.is_active);
    }

    #[test]
    fn test_increment_raised() {
        let conn = test_db();
        increment_raised(&conn, 500.0).expect("inc");
        increment_raised(&conn, 250.0).expect("inc");

        let row = state(&conn).expect("state");
        assert_eq!(row.total_raised, 750.0);
        assert_eq!(row.participants, 2);
    }

    #[test]
    fn test_update_state_partial() {
        let conn = test_db();
        update_state(&conn, Some(1_000.0), None, None).expect("update");
        update_state(&conn, None, Some(5_000_000.0), None).expect("update");

        let row = state(&conn).expect("state");
        assert_eq!(row.total_raised, 1_000.0);
        assert_eq!(row.goal, 5_000_000.0);
        assert!(row.is_active);

        update_state(&conn, None, None, Some(false)).expect("update");
        assert!(!state(&conn).expect("state").is_active);
    }
}
