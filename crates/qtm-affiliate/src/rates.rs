//! The commission rate table.
//!
//! Commissions fan out over at most five upline levels:
//!
//! - **Level 1** (direct sponsor): 20%
//! - **Level 2**: 10%
//! - **Level 3**: 5%
//! - **Level 4**: 2.5%
//! - **Level 5**: 1%
//!
//! Total across a full chain: 38.5% of the net purchase amount. The table
//! is process-wide and read-only; the percentage actually applied is also
//! stored on every ledger entry, so historical rows survive any future
//! rate change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AffiliateError, Result};

/// Maximum number of upline levels paid out.
pub const MAX_LEVELS: u8 = qtm_types::MAX_COMMISSION_LEVELS;

/// Commission percentage per level, index 0 = level 1.
pub const COMMISSION_RATES_PCT: [f64; MAX_LEVELS as usize] = [20.0, 10.0, 5.0, 2.5, 1.0];

/// Rate for one level as both a percentage and a decimal multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelRate {
    /// Rate expressed 0-100.
    pub percentage: f64,
    /// Rate expressed 0-1.
    pub decimal: f64,
}

/// Read-only view of the whole rate table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateTable {
    pub max_levels: u8,
    pub commission_rates: BTreeMap<u8, LevelRate>,
    pub total_commission_percentage: f64,
}

/// Validate a level-scoped query parameter.
pub fn validate_level(level: u8) -> Result<()> {
    if level == 0 || level > MAX_LEVELS {
        return Err(AffiliateError::InvalidLevel { level });
    }
    Ok(())
}

/// Rate for a level, expressed 0-100. `None` outside 1..=5.
pub fn rate_for_level(level: u8) -> Option<f64> {
    if level == 0 || level > MAX_LEVELS {
        return None;
    }
    Some(COMMISSION_RATES_PCT[(level - 1) as usize])
}

/// Sum of all level percentages (38.5).
pub fn total_rate_pct() -> f64 {
    COMMISSION_RATES_PCT.iter().sum()
}

/// The full table as exposed on the config endpoint.
pub fn table() -> RateTable {
    let commission_rates = (1..=MAX_LEVELS)
        .filter_map(|level| {
            rate_for_level(level).map(|pct| {
                (
                    level,
                    LevelRate {
                        percentage: pct,
                        decimal: pct / 100.0,
                    },
                )
            })
        })
        .collect();

    RateTable {
        max_levels: MAX_LEVELS,
        commission_rates,
        total_commission_percentage: total_rate_pct(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_per_level() {
        assert_eq!(rate_for_level(1), Some(20.0));
        assert_eq!(rate_for_level(2), Some(10.0));
        assert_eq!(rate_for_level(3), Some(5.0));
        assert_eq!(rate_for_level(4), Some(2.5));
        assert_eq!(rate_for_level(5), Some(1.0));
    }

    #[test]
    fn test_rates_out_of_range() {
        assert_eq!(rate_for_level(0), None);
        assert_eq!(rate_for_level(6), None);
    }

    #[test]
    fn test_total_rate() {
        let total = total_rate_pct();
        assert!((total - 38.5).abs() < 1e-9, "total should be 38.5, got {total}");
    }

    #[test]
    fn test_validate_level_bounds() {
        assert!(validate_level(0).is_err());
        assert!(validate_level(6).is_err());
        for level in 1..=5 {
            validate_level(level).expect("valid level");
        }
    }

    #[test]
    fn test_table_view() {
        let table = table();
        assert_eq!(table.max_levels, 5);
        assert_eq!(table.commission_rates.len(), 5);

        let level_4 = &table.commission_rates[&4];
        assert_eq!(level_4.percentage, 2.5);
        assert!((level_4.decimal - 0.025).abs() < 1e-12);
        assert!((table.total_commission_percentage - 38.5).abs() < 1e-9);
    }
}
