//! Purchase lifecycle.
//!
//! A purchase is recorded as `initiated` when a checkout session or a
//! crypto transfer intent is created, and finalized to `completed` once
//! the external payment confirmation arrives (or `expired` if it never
//! does). Completion bumps the presale progress counters; distribution of
//! affiliate commissions is chained by the caller, using the purchase id
//! as the commission event id.

use rusqlite::Connection;

use qtm_db::queries::presale;
use qtm_db::DbError;
use qtm_types::presale::{PaymentMethod, PurchaseRecord, PurchaseStatus};
use qtm_types::{MIN_PURCHASE_TOKENS, TOKEN_PRICE_USD};

use crate::{new_id, PresaleError, Result};

/// Record a new purchase intent.
///
/// # Errors
///
/// - [`PresaleError::BelowMinimum`] for token amounts under the minimum
/// - [`PresaleError::Inactive`] when the presale has been switched off
pub fn record_purchase(
    conn: &Connection,
    wallet: &str,
    token_amount: u32,
    payment_method: PaymentMethod,
    referral_code: Option<&str>,
    now: u64,
) -> Result<PurchaseRecord> {
    if token_amount < MIN_PURCHASE_TOKENS {
        return Err(PresaleError::BelowMinimum {
            tokens: token_amount,
            min: MIN_PURCHASE_TOKENS,
        });
    }
    if !presale::state(conn)?.is_active {
        return Err(PresaleError::Inactive);
    }

    let purchase = PurchaseRecord {
        purchase_id: new_id("pur"),
        wallet: wallet.to_string(),
        token_amount,
        amount_usd: f64::from(token_amount) * TOKEN_PRICE_USD,
        payment_method,
        referral_code: referral_code.map(str::to_string),
        status: PurchaseStatus::Initiated,
        created_at: now,
    };
    presale::insert_purchase(conn, &purchase)?;

    tracing::info!(
        purchase_id = %purchase.purchase_id,
        wallet,
        tokens = token_amount,
        amount_usd = purchase.amount_usd,
        method = payment_method.as_str(),
        "purchase recorded"
    );
    Ok(purchase)
}

/// Mark a purchase as paid and add it to the progress counters.
///
/// The status flip and the counter bump happen in one transaction, and
/// the guarded `initiated -> completed` update makes a second
/// confirmation of the same purchase fail instead of double-counting.
pub fn complete_purchase(conn: &mut Connection, purchase_id: &str) -> Result<PurchaseRecord> {
    let tx = conn.transaction().map_err(DbError::Sqlite)?;
    presale::finalize_purchase(&tx, purchase_id, PurchaseStatus::Completed)?;
    let purchase = presale::get_purchase(&tx, purchase_id)?;
    presale::increment_raised(&tx, purchase.amount_usd)?;
    tx.commit().map_err(DbError::Sqlite)?;

    tracing::info!(purchase_id, amount_usd = purchase.amount_usd, "purchase completed");
    Ok(purchase)
}

/// Outcome of a payment confirmation attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    pub purchase: PurchaseRecord,
    /// `false` when the purchase was already completed by an earlier
    /// confirmation; the counters were not bumped again.
    pub newly_completed: bool,
}

/// Confirm payment for a purchase, converging under redelivery.
///
/// Payment confirmations arrive at-least-once, and downstream work
/// (buyer linking, commission distribution) is chained off this call. A
/// redelivered confirmation for an already-completed purchase therefore
/// returns the record with `newly_completed = false` instead of erroring,
/// so the caller can re-run its idempotent downstream steps. Only a
/// purchase that was never recorded, or one that expired, is an error.
pub fn confirm_purchase(conn: &mut Connection, purchase_id: &str) -> Result<Confirmation> {
    match complete_purchase(conn, purchase_id) {
        Ok(purchase) => Ok(Confirmation {
            purchase,
            newly_completed: true,
        }),
        Err(PresaleError::Db(DbError::NotFound(_))) => {
            let purchase = presale::get_purchase(conn, purchase_id)?;
            if purchase.status == PurchaseStatus::Completed {
                tracing::info!(purchase_id, "purchase already completed, redelivery");
                Ok(Confirmation {
                    purchase,
                    newly_completed: false,
                })
            } else {
                Err(PresaleError::Db(DbError::NotFound(format!(
                    "confirmable purchase {purchase_id}"
                ))))
            }
        }
        Err(e) => Err(e),
    }
}

/// Mark an abandoned card session as expired. Counters are untouched.
pub fn expire_purchase(conn: &Connection, purchase_id: &str) -> Result<PurchaseRecord> {
    presale::finalize_purchase(conn, purchase_id, PurchaseStatus::Expired)?;
    Ok(presale::get_purchase(conn, purchase_id)?)
}
