//! The commission distribution engine.
//!
//! Given a completed revenue event, walks the source wallet's stored
//! ancestry (at most 5 edges), computes one commission per level from the
//! rate table, and writes the ledger entries in a single transaction.
//!
//! ## Idempotence
//!
//! The ledger's `(event_id, beneficiary, level)` UNIQUE key makes
//! redelivery safe: an already-recorded triple is skipped, contributes
//! nothing to the outcome, and is never an error. Callers own retry
//! policy and may re-drive the same event freely.
//!
//! ## Notifications
//!
//! One notification per created entry is written *after* the ledger
//! transaction commits, best-effort: a notification failure is logged and
//! never rolls back or fails the distribution.

use rusqlite::Connection;

use qtm_db::queries::{ancestry, ledger, notifications};
use qtm_db::DbError;
use qtm_types::affiliate::{AffiliateEventType, CommissionEntry, CommissionStatus};
use qtm_types::notification::{Notification, NOTIF_COMMISSION_RECEIVED};

use crate::{new_id, rates, register, Result};

/// Result of one distribution call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DistributionOutcome {
    /// Ledger entries actually written by this call.
    pub entries_created: u32,
    /// Sum of the amounts of those entries, in USD.
    pub total_distributed: f64,
}

/// Distribute commissions for a revenue event up the sponsor chain.
///
/// A source wallet with no ancestry (including one never seen before,
/// which is auto-provisioned without a sponsor) yields a zero outcome,
/// not an error.
///
/// # Errors
///
/// - [`crate::AffiliateError::InvalidAmount`] for negative or non-finite
///   amounts; no partial effect
/// - [`crate::AffiliateError::Db`] if any ledger write fails, in which
///   case the whole distribution is rolled back
pub fn distribute(
    conn: &mut Connection,
    source_wallet: &str,
    net_amount: f64,
    event_type: AffiliateEventType,
    event_id: &str,
    now: u64,
) -> Result<DistributionOutcome> {
    if !net_amount.is_finite() || net_amount < 0.0 {
        return Err(crate::AffiliateError::InvalidAmount { amount: net_amount });
    }

    // Auto-provision unknown purchasers; their ancestry is empty.
    register::register(conn, source_wallet, None, now)?;

    let edges = ancestry::upline(conn, source_wallet)?;
    if edges.is_empty() {
        return Ok(DistributionOutcome::default());
    }

    let mut outcome = DistributionOutcome::default();
    let mut pending_notifications = Vec::new();

    // All present levels are written as one logical unit: a failure on
    // any level aborts the whole distribution.
    let tx = conn.transaction().map_err(DbError::Sqlite)?;
    for edge in &edges {
        let Some(percentage) = rates::rate_for_level(edge.level).filter(|p| *p > 0.0) else {
            continue;
        };
        let amount = net_amount * percentage / 100.0;

        let entry = CommissionEntry {
            id: new_id("com"),
            source_wallet: source_wallet.to_string(),
            beneficiary_wallet: edge.ancestor_wallet.clone(),
            level: edge.level,
            percentage,
            amount,
            event_type,
            event_id: event_id.to_string(),
            status: CommissionStatus::Pending,
            created_at: now,
        };

        if ledger::insert_commission(&tx, &entry)? {
            outcome.entries_created += 1;
            outcome.total_distributed += amount;
            pending_notifications.push(commission_notification(&entry, net_amount));
        } else {
            tracing::debug!(
                event_id,
                beneficiary = %edge.ancestor_wallet,
                level = edge.level,
                "commission already recorded, skipping"
            );
        }
    }
    tx.commit().map_err(DbError::Sqlite)?;

    for notif in &pending_notifications {
        if let Err(e) = notifications::insert(conn, notif) {
            tracing::warn!(
                wallet = %notif.wallet,
                error = %e,
                "commission notification write failed"
            );
        }
    }

    tracing::info!(
        source_wallet,
        event_id,
        entries = outcome.entries_created,
        total = outcome.total_distributed,
        "commission distribution complete"
    );

    Ok(outcome)
}

/// Build the beneficiary-facing notification for one ledger entry.
fn commission_notification(entry: &CommissionEntry, purchase_amount: f64) -> Notification {
    Notification {
        id: new_id("ntf"),
        wallet: entry.beneficiary_wallet.clone(),
        notif_type: NOTIF_COMMISSION_RECEIVED.to_string(),
        title: format!("Commission Niveau {}", entry.level),
        body: format!(
            "Vous avez reçu {:.2} USD de commission ({}% d'un achat de {:.2} USD)",
            entry.amount, entry.percentage, purchase_amount
        ),
        payload: serde_json::json!({
            "source_wallet": entry.source_wallet,
            "level": entry.level,
            "commission_amount": entry.amount,
            "purchase_amount": purchase_amount,
        }),
        read: false,
        created_at: entry.created_at,
    }
}
