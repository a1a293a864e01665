//! Ancestry store query functions.
//!
//! Edges are written once at registration time and never mutated. For a
//! fixed wallet the levels are contiguous starting at 1.

use rusqlite::Connection;

use qtm_types::affiliate::AncestryEdge;

use crate::Result;

/// Insert one ancestry edge.
pub fn insert(
    conn: &Connection,
    wallet: &str,
    ancestor_wallet: &str,
    level: u8,
    created_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ancestry (wallet, ancestor_wallet, level, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![wallet, ancestor_wallet, level, created_at as i64],
    )?;
    Ok(())
}

/// All upline edges for a wallet, ordered by level ascending. At most 5.
pub fn upline(conn: &Connection, wallet: &str) -> Result<Vec<AncestryEdge>> {
    let mut stmt = conn.prepare(
        "SELECT wallet, ancestor_wallet, level, created_at
         FROM ancestry WHERE wallet = ?1 ORDER BY level ASC",
    )?;

    let rows = stmt
        .query_map([wallet], |row| {
            Ok(AncestryEdge {
                wallet: row.get(0)?,
                ancestor_wallet: row.get(1)?,
                level: row.get::<_, u8>(2)?,
                created_at: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Number of downline members sitting exactly `level` hops below `wallet`.
pub fn downline_count(conn: &Connection, wallet: &str, level: u8) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ancestry WHERE ancestor_wallet = ?1 AND level = ?2",
        rusqlite::params![wallet, level],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Wallets whose direct (level-1) sponsor is `wallet`.
pub fn direct_downline(conn: &Connection, wallet: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT wallet FROM ancestry WHERE ancestor_wallet = ?1 AND level = 1
         ORDER BY created_at ASC",
    )?;

    let rows = stmt
        .query_map([wallet], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(rows)
}
