//! # qtm-affiliate
//!
//! The multi-level commission engine: referral registration, bounded
//! 5-level commission distribution, stats aggregation, and the downline
//! tree.
//!
//! ## Modules
//!
//! - [`rates`] — the fixed level -> percentage rate table
//! - [`register`] — registration and ancestry construction
//! - [`distribute`] — the commission distribution engine
//! - [`stats`] — per-level stats aggregation
//! - [`history`] — ledger history and level-scoped transaction reads
//! - [`tree`] — downline referral tree
//!
//! All operations work against a `rusqlite::Connection` from `qtm-db` and
//! take the current time explicitly; nothing here reads the wall clock.

pub mod distribute;
pub mod history;
pub mod rates;
pub mod register;
pub mod stats;
pub mod tree;

use qtm_db::DbError;

/// Error types for affiliate operations.
#[derive(Debug, thiserror::Error)]
pub enum AffiliateError {
    /// Underlying storage failure.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// Caller supplied a negative or non-finite amount.
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: f64,
    },

    /// Caller supplied a level outside 1..=5.
    #[error("invalid level: {level} (expected 1..=5)")]
    InvalidLevel {
        /// The rejected level.
        level: u8,
    },

    /// Referral-code generation kept colliding.
    #[error("referral code generation exhausted after {attempts} attempts")]
    CodeExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Convenience result type for affiliate operations.
pub type Result<T> = std::result::Result<T, AffiliateError>;

/// Generate a prefixed random identifier for ledger and notification rows.
pub(crate) fn new_id(prefix: &str) -> String {
    let bytes: [u8; 8] = rand::random();
    format!("{prefix}_{}", hex::encode(bytes))
}
