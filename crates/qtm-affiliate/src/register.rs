//! Registration service: user creation, referral-code allocation, and
//! ancestry construction.
//!
//! Registration is idempotent per wallet. The referral-code UNIQUE
//! constraint in storage is the authoritative collision detector: the
//! insert is attempted and a uniqueness violation triggers either a
//! "return existing user" (wallet raced in concurrently) or a code
//! regeneration, never a caller-visible error.

use rand::Rng;
use rusqlite::Connection;

use qtm_db::queries::{ancestry, users};
use qtm_db::DbError;
use qtm_types::affiliate::UserRecord;
use qtm_types::{REFERRAL_CODE_PREFIX, REFERRAL_CODE_SUFFIX_LEN};

use crate::rates::MAX_LEVELS;
use crate::{AffiliateError, Result};

/// Code alphabet without visually ambiguous characters (0/O, 1/I).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generation attempts before giving up. Collisions are rare (32^5 code
/// space), so hitting this bound indicates a data problem, not bad luck.
const MAX_CODE_ATTEMPTS: u32 = 16;

/// Register a wallet, optionally linked to a sponsor via their referral
/// code.
///
/// - An already-registered wallet is returned unchanged, even if a
///   different `referral_code_used` is supplied.
/// - An absent, unknown, or malformed code means "no sponsor", not an
///   error.
/// - When a sponsor resolves, the new user's ancestry edges are written
///   in the same transaction as the user row: the sponsor at level 1,
///   then the sponsor's own recorded uplink per additional level, capped
///   at 5 hops.
///
/// # Errors
///
/// - [`AffiliateError::CodeExhausted`] if code generation keeps colliding
/// - [`AffiliateError::Db`] on storage failure
pub fn register(
    conn: &mut Connection,
    wallet: &str,
    referral_code_used: Option<&str>,
    now: u64,
) -> Result<UserRecord> {
    if let Some(existing) = users::get_opt(conn, wallet)? {
        return Ok(existing);
    }

    let sponsor_wallet = match referral_code_used {
        Some(code) => users::find_by_code(conn, code)?.map(|u| u.wallet),
        None => None,
    };

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate_code();

        let tx = conn.transaction().map_err(DbError::Sqlite)?;
        match users::insert(&tx, wallet, &code, sponsor_wallet.as_deref(), now) {
            Ok(()) => {
                if let Some(sponsor) = sponsor_wallet.as_deref() {
                    build_ancestry(&tx, wallet, sponsor, now)?;
                }
                tx.commit().map_err(DbError::Sqlite)?;

                tracing::info!(
                    wallet,
                    referral_code = %code,
                    sponsor = ?sponsor_wallet,
                    "affiliate registered"
                );
                return users::get(conn, wallet).map_err(Into::into);
            }
            Err(e) if e.is_constraint_violation() => {
                drop(tx);
                // Either the wallet raced in on another connection, or
                // the generated code collided.
                if let Some(existing) = users::get_opt(conn, wallet)? {
                    return Ok(existing);
                }
                tracing::debug!(wallet, attempt, "referral code collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AffiliateError::CodeExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Generate a candidate referral code: `QTM` + 5 random alphabet chars.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERRAL_CODE_SUFFIX_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{REFERRAL_CODE_PREFIX}{suffix}")
}

/// Write the ancestry edges for a freshly inserted user.
///
/// The walk is bounded strictly by the level cap, never by a liveness
/// check on the chain, so circular sponsor data upstream cannot make it
/// loop.
fn build_ancestry(conn: &Connection, wallet: &str, sponsor: &str, now: u64) -> Result<()> {
    let mut ancestor = sponsor.to_string();
    for level in 1..=MAX_LEVELS {
        ancestry::insert(conn, wallet, &ancestor, level, now)?;

        match users::get_opt(conn, &ancestor)?.and_then(|u| u.sponsor_wallet) {
            Some(next) => ancestor = next,
            // Chain ends naturally; the user gets fewer than 5 edges.
            None => break,
        }
    }
    Ok(())
}
