//! Per-level stats aggregation.
//!
//! Recomputed on every call from the ancestry store and the commission
//! ledger; nothing is cached, so the result always reflects the latest
//! ledger state.

use rusqlite::Connection;

use qtm_db::queries::{ancestry, ledger};
use qtm_types::affiliate::{AffiliateStats, LevelStats};

use crate::rates::MAX_LEVELS;
use crate::{register, Result};

/// Aggregate stats for a wallet.
///
/// A wallet never seen before is auto-provisioned (without a sponsor) and
/// returns all-zero stats rather than an error.
pub fn stats(conn: &mut Connection, wallet: &str, now: u64) -> Result<AffiliateStats> {
    let user = register::register(conn, wallet, None, now)?;

    let mut levels = Vec::with_capacity(MAX_LEVELS as usize);
    let mut total_referrals = 0u32;
    let mut total = 0.0;
    let mut pending = 0.0;
    let mut confirmed = 0.0;
    let mut paid = 0.0;

    for level in 1..=MAX_LEVELS {
        let referral_count = ancestry::downline_count(conn, wallet, level)?;
        let sums = ledger::status_totals(conn, wallet, level)?;

        total_referrals += referral_count;
        total += sums.total;
        pending += sums.pending;
        confirmed += sums.confirmed;
        paid += sums.paid;

        levels.push(LevelStats {
            level,
            referral_count,
            total_commission: sums.total,
            pending_commission: sums.pending,
            confirmed_commission: sums.confirmed,
            paid_commission: sums.paid,
        });
    }

    Ok(AffiliateStats {
        wallet: user.wallet,
        referral_code: user.referral_code,
        total_referrals,
        total_earnings: total,
        pending_earnings: pending,
        confirmed_earnings: confirmed,
        paid_earnings: paid,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribute::distribute;
    use qtm_types::affiliate::{AffiliateEventType, CommissionStatus};

    fn test_db() -> Connection {
        qtm_db::open_memory().expect("open test db")
    }

    #[test]
    fn test_fresh_wallet_auto_provisioned_all_zero() {
        let mut conn = test_db();
        let s = stats(&mut conn, "fresh", 100).expect("stats");

        assert_eq!(s.wallet, "fresh");
        assert!(s.referral_code.starts_with("QTM"));
        assert_eq!(s.total_referrals, 0);
        assert_eq!(s.total_earnings, 0.0);
        assert_eq!(s.levels.len(), 5);
        for (i, level) in s.levels.iter().enumerate() {
            assert_eq!(level.level as usize, i + 1);
            assert_eq!(level.referral_count, 0);
            assert_eq!(level.total_commission, 0.0);
        }
    }

    #[test]
    fn test_stats_reflect_distribution() {
        let mut conn = test_db();
        let a = register::register(&mut conn, "a", None, 100).expect("register");
        let b = register::register(&mut conn, "b", Some(&a.referral_code), 101).expect("register");
        register::register(&mut conn, "c", Some(&b.referral_code), 102).expect("register");

        distribute(
            &mut conn,
            "c",
            500.0,
            AffiliateEventType::PresalePurchase,
            "evt-1",
            200,
        )
        .expect("distribute");

        // B is C's direct sponsor: level 1, 20% of 500
        let stats_b = stats(&mut conn, "b", 300).expect("stats");
        assert_eq!(stats_b.levels[0].referral_count, 1);
        assert!((stats_b.levels[0].total_commission - 100.0).abs() < 1e-9);
        assert!((stats_b.levels[0].pending_commission - 100.0).abs() < 1e-9);
        assert_eq!(stats_b.levels[0].confirmed_commission, 0.0);

        // A sits two hops above C: level 2, 10% of 500
        let stats_a = stats(&mut conn, "a", 300).expect("stats");
        assert!((stats_a.levels[1].total_commission - 50.0).abs() < 1e-9);
        // A's downline: B at level 1, C at level 2
        assert_eq!(stats_a.levels[0].referral_count, 1);
        assert_eq!(stats_a.levels[1].referral_count, 1);
        assert_eq!(stats_a.total_referrals, 2);
        assert!((stats_a.total_earnings - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_partition_by_status() {
        let mut conn = test_db();
        let a = register::register(&mut conn, "a", None, 100).expect("register");
        register::register(&mut conn, "b", Some(&a.referral_code), 101).expect("register");

        distribute(&mut conn, "b", 100.0, AffiliateEventType::PresalePurchase, "evt-1", 200)
            .expect("distribute");
        distribute(&mut conn, "b", 300.0, AffiliateEventType::PresalePurchase, "evt-2", 201)
            .expect("distribute");

        // Confirm the first entry (20% of 100 = 20)
        let entries = ledger::history(&conn, "a", 10, 0).expect("history");
        let first = entries
            .iter()
            .find(|e| e.event_id == "evt-1")
            .expect("evt-1 entry");
        ledger::update_status(&conn, &first.id, CommissionStatus::Confirmed).expect("confirm");

        let s = stats(&mut conn, "a", 300).expect("stats");
        assert!((s.total_earnings - 80.0).abs() < 1e-9);
        assert!((s.pending_earnings - 60.0).abs() < 1e-9);
        assert!((s.confirmed_earnings - 20.0).abs() < 1e-9);
        assert_eq!(s.paid_earnings, 0.0);
    }
}
