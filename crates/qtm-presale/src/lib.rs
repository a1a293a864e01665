//! # qtm-presale
//!
//! Presale purchase records and progress reporting.
//!
//! ## Modules
//!
//! - [`purchase`] — purchase lifecycle (initiated -> completed/expired)
//! - [`progress`] — progress computation and the TTL snapshot cache

pub mod progress;
pub mod purchase;

use qtm_db::DbError;

/// Error types for presale operations.
#[derive(Debug, thiserror::Error)]
pub enum PresaleError {
    /// Underlying storage failure.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// Purchase below the minimum token amount.
    #[error("purchase of {tokens} tokens is below the minimum of {min}")]
    BelowMinimum {
        /// Requested token amount.
        tokens: u32,
        /// Configured minimum.
        min: u32,
    },

    /// The presale is not accepting purchases.
    #[error("presale is not active")]
    Inactive,
}

/// Convenience result type for presale operations.
pub type Result<T> = std::result::Result<T, PresaleError>;

/// Generate a prefixed random identifier for purchase rows.
pub(crate) fn new_id(prefix: &str) -> String {
    let bytes: [u8; 8] = rand::random();
    format!("{prefix}_{}", hex::encode(bytes))
}
