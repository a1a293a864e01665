//! Ledger history reads: full commission history and level-scoped
//! transaction listings.

use rusqlite::Connection;

use qtm_db::queries::ledger;
use qtm_types::affiliate::CommissionEntry;

use crate::{rates, Result};

/// Default page size for history reads.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// A page of a beneficiary's commission history.
#[derive(Clone, Debug)]
pub struct CommissionHistory {
    pub wallet: String,
    pub commissions: Vec<CommissionEntry>,
    pub total_count: u32,
}

/// A page of a beneficiary's ledger entries at one level.
#[derive(Clone, Debug)]
pub struct LevelTransactions {
    pub wallet: String,
    pub level: u8,
    /// The configured rate for this level, expressed 0-100.
    pub commission_rate: f64,
    pub transactions: Vec<CommissionEntry>,
    pub total_count: u32,
    pub total_amount: f64,
}

/// Commission history for a wallet, newest first.
pub fn commission_history(
    conn: &Connection,
    wallet: &str,
    limit: u32,
    offset: u32,
) -> Result<CommissionHistory> {
    let commissions = ledger::history(conn, wallet, limit, offset)?;
    let total_count = ledger::history_count(conn, wallet)?;

    Ok(CommissionHistory {
        wallet: wallet.to_string(),
        commissions,
        total_count,
    })
}

/// Level-scoped ledger entries for a wallet.
///
/// # Errors
///
/// - [`crate::AffiliateError::InvalidLevel`] for levels outside 1..=5
pub fn level_transactions(
    conn: &Connection,
    wallet: &str,
    level: u8,
    limit: u32,
    offset: u32,
) -> Result<LevelTransactions> {
    rates::validate_level(level)?;

    let transactions = ledger::level_transactions(conn, wallet, level, limit, offset)?;
    let (total_count, total_amount) = ledger::level_summary(conn, wallet, level)?;

    Ok(LevelTransactions {
        wallet: wallet.to_string(),
        level,
        commission_rate: rates::rate_for_level(level).unwrap_or(0.0),
        transactions,
        total_count,
        total_amount,
    })
}
