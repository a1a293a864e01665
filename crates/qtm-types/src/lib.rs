//! # qtm-types
//!
//! Shared domain types used across the QTM presale backend workspace.

pub mod affiliate;
pub mod notification;
pub mod presale;

/// Common type alias: a Solana wallet public key in base58 form.
pub type Wallet = String;

/// Maximum depth of the sponsor chain tracked per user.
pub const MAX_COMMISSION_LEVELS: u8 = 5;

/// Prefix of every generated referral code.
pub const REFERRAL_CODE_PREFIX: &str = "QTM";

/// Random characters appended after the prefix.
pub const REFERRAL_CODE_SUFFIX_LEN: usize = 5;

/// Token price in USD.
pub const TOKEN_PRICE_USD: f64 = 2.5;

/// Minimum tokens per purchase.
pub const MIN_PURCHASE_TOKENS: u32 = 100;

/// Default presale fundraising goal in USD.
pub const DEFAULT_PRESALE_GOAL_USD: f64 = 2_000_000.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_code_shape_constants() {
        assert_eq!(REFERRAL_CODE_PREFIX.len() + REFERRAL_CODE_SUFFIX_LEN, 8);
    }

    #[test]
    fn test_level_cap() {
        assert_eq!(MAX_COMMISSION_LEVELS, 5);
    }
}
