//! Presale progress computation and the TTL snapshot cache.
//!
//! The progress endpoint is public and read-heavy; a short-lived cached
//! snapshot is acceptable there (unlike affiliate stats, which are always
//! recomputed). The cache is an explicit struct owned by the caller, with
//! an explicit TTL and invalidation hook rather than ambient module
//! state.

use rusqlite::Connection;

use qtm_db::queries::presale;
use qtm_types::presale::PresaleProgress;

use crate::Result;

/// Default snapshot lifetime in seconds.
pub const DEFAULT_PROGRESS_TTL_SECS: u64 = 30;

/// Compute the current progress snapshot from the counters.
pub fn progress(conn: &Connection) -> Result<PresaleProgress> {
    let state = presale::state(conn)?;

    let progress_percentage = if state.goal > 0.0 {
        state.total_raised / state.goal * 100.0
    } else {
        0.0
    };

    Ok(PresaleProgress {
        total_raised: state.total_raised,
        goal: state.goal,
        progress_percentage,
        remaining: (state.goal - state.total_raised).max(0.0),
        participants: state.participants,
        is_active: state.is_active,
    })
}

/// A cached progress snapshot with a time-to-live.
#[derive(Debug)]
pub struct ProgressCache {
    ttl_secs: u64,
    cached: Option<(PresaleProgress, u64)>,
}

impl ProgressCache {
    /// Create an empty cache with the given TTL.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            cached: None,
        }
    }

    /// Return the cached snapshot if fresh, otherwise recompute and
    /// store it.
    pub fn get(&mut self, conn: &Connection, now: u64) -> Result<PresaleProgress> {
        if let Some((snapshot, cached_at)) = &self.cached {
            if now.saturating_sub(*cached_at) < self.ttl_secs {
                return Ok(snapshot.clone());
            }
        }

        let snapshot = progress(conn)?;
        self.cached = Some((snapshot.clone(), now));
        Ok(snapshot)
    }

    /// Drop the cached snapshot (called after counter mutations).
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        qtm_db::open_memory().expect("open test db")
    }

    #[test]
    fn test_progress_defaults() {
        let conn = test_db();
        let p = progress(&conn).expect("progress");
        assert_eq!(p.total_raised, 0.0);
        assert_eq!(p.goal, 2_000_000.0);
        assert_eq!(p.progress_percentage, 0.0);
        assert_eq!(p.remaining, 2_000_000.0);
        assert!(p.is_active);
    }

    #[test]
    fn test_progress_math() {
        let conn = test_db();
        presale::update_state(&conn, Some(500_000.0), None, None).expect("update");

        let p = progress(&conn).expect("progress");
        assert!((p.progress_percentage - 25.0).abs() < 1e-9);
        assert_eq!(p.remaining, 1_500_000.0);
    }

    #[test]
    fn test_overfunded_remaining_clamped() {
        let conn = test_db();
        presale::update_state(&conn, Some(3_000_000.0), None, None).expect("update");

        let p = progress(&conn).expect("progress");
        assert_eq!(p.remaining, 0.0);
        assert!(p.progress_percentage > 100.0);
    }

    #[test]
    fn test_zero_goal_does_not_divide() {
        let conn = test_db();
        presale::update_state(&conn, Some(100.0), Some(0.0), None).expect("update");

        let p = progress(&conn).expect("progress");
        assert_eq!(p.progress_percentage, 0.0);
    }

    #[test]
    fn test_cache_serves_stale_within_ttl() {
        let conn = test_db();
        let mut cache = ProgressCache::new(30);

        let first = cache.get(&conn, 1_000).expect("get");
        assert_eq!(first.total_raised, 0.0);

        presale::update_state(&conn, Some(500.0), None, None).expect("update");

        // Within TTL: stale snapshot
        let second = cache.get(&conn, 1_010).expect("get");
        assert_eq!(second.total_raised, 0.0);

        // Past TTL: refreshed
        let third = cache.get(&conn, 1_030).expect("get");
        assert_eq!(third.total_raised, 500.0);
    }

    #[test]
    fn test_cache_invalidation() {
        let conn = test_db();
        let mut cache = ProgressCache::new(30);
        cache.get(&conn, 1_000).expect("warm");

        presale::update_state(&conn, Some(500.0), None, None).expect("update");
        cache.invalidate();

        let fresh = cache.get(&conn, 1_001).expect("get");
        assert_eq!(fresh.total_raised, 500.0);
    }
}
