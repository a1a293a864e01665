//! Downline referral tree.
//!
//! Traverses the ancestry graph in the inverse direction of the upline
//! walk: level-1 edges pointing *at* a wallet are its direct downline.
//! Termination is guaranteed by a strict depth bound plus a visited set,
//! so malformed or circular data cannot loop the traversal.

use std::collections::HashSet;

use rusqlite::Connection;

use qtm_db::queries::{ancestry, ledger, users};
use qtm_types::affiliate::{ReferralTree, TreeNode};

use crate::Result;

/// Default tree depth when the caller does not specify one.
pub const DEFAULT_TREE_DEPTH: u8 = 2;

/// Hard ceiling on the requested depth.
pub const MAX_TREE_DEPTH: u8 = 5;

/// Build the downline tree for a wallet, `max_depth` hops deep.
///
/// A requested depth of 0 or above [`MAX_TREE_DEPTH`] is clamped. Members
/// referenced by an ancestry edge but missing from the user directory are
/// dangling references; their branch is omitted, not an error.
pub fn tree(conn: &Connection, wallet: &str, max_depth: u8) -> Result<ReferralTree> {
    let max_depth = max_depth.clamp(1, MAX_TREE_DEPTH);

    let mut visited = HashSet::new();
    visited.insert(wallet.to_string());

    let mut network_size = 0u32;
    let nodes = build_children(conn, wallet, 1, max_depth, &mut visited, &mut network_size)?;

    Ok(ReferralTree {
        wallet: wallet.to_string(),
        tree: nodes,
        total_network_size: network_size,
    })
}

/// Build the child nodes of `wallet` at `depth` hops from the root.
///
/// Each node's subtree commission total is its own sourced ledger amounts
/// plus its children's totals, accumulated on the way back up.
fn build_children(
    conn: &Connection,
    wallet: &str,
    depth: u8,
    max_depth: u8,
    visited: &mut HashSet<String>,
    network_size: &mut u32,
) -> Result<Vec<TreeNode>> {
    let mut nodes = Vec::new();

    for child_wallet in ancestry::direct_downline(conn, wallet)? {
        if !visited.insert(child_wallet.clone()) {
            tracing::warn!(wallet = %child_wallet, "cycle in referral graph, skipping revisit");
            continue;
        }

        // Dangling edge: edge exists but the user record does not
        let Some(child) = users::get_opt(conn, &child_wallet)? else {
            tracing::warn!(wallet = %child_wallet, "dangling referral edge, omitting branch");
            continue;
        };

        let children = if depth < max_depth {
            build_children(conn, &child_wallet, depth + 1, max_depth, visited, network_size)?
        } else {
            Vec::new()
        };

        let mut subtree_commissions = ledger::source_total(conn, &child_wallet)?;
        subtree_commissions += children.iter().map(|c| c.subtree_commissions).sum::<f64>();

        *network_size += 1;
        nodes.push(TreeNode {
            wallet: child.wallet,
            referral_code: child.referral_code,
            direct_referrals: ancestry::downline_count(conn, &child_wallet, 1)?,
            subtree_commissions,
            children,
        });
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribute::distribute;
    use crate::register;
    use qtm_types::affiliate::AffiliateEventType;

    fn test_db() -> Connection {
        qtm_db::open_memory().expect("open test db")
    }

    #[test]
    fn test_empty_tree() {
        let mut conn = test_db();
        register::register(&mut conn, "root", None, 100).expect("register");

        let t = tree(&conn, "root", DEFAULT_TREE_DEPTH).expect("tree");
        assert!(t.tree.is_empty());
        assert_eq!(t.total_network_size, 0);
    }

    #[test]
    fn test_two_level_tree() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        let b = register::register(&mut conn, "b", Some(&root.referral_code), 101)
            .expect("register");
        register::register(&mut conn, "c1", Some(&b.referral_code), 102).expect("register");
        register::register(&mut conn, "c2", Some(&b.referral_code), 103).expect("register");

        let t = tree(&conn, "root", 2).expect("tree");
        assert_eq!(t.tree.len(), 1);
        assert_eq!(t.total_network_size, 3);

        let node_b = &t.tree[0];
        assert_eq!(node_b.wallet, "b");
        assert_eq!(node_b.direct_referrals, 2);
        assert_eq!(node_b.children.len(), 2);
    }

    #[test]
    fn test_depth_bound_cuts_off() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        let b = register::register(&mut conn, "b", Some(&root.referral_code), 101)
            .expect("register");
        register::register(&mut conn, "c", Some(&b.referral_code), 102).expect("register");

        let t = tree(&conn, "root", 1).expect("tree");
        assert_eq!(t.tree.len(), 1);
        assert!(t.tree[0].children.is_empty());
        assert_eq!(t.total_network_size, 1);
        // But b still reports its direct referral count
        assert_eq!(t.tree[0].direct_referrals, 1);
    }

    #[test]
    fn test_subtree_commissions_accumulate() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        let b = register::register(&mut conn, "b", Some(&root.referral_code), 101)
            .expect("register");
        register::register(&mut conn, "c", Some(&b.referral_code), 102).expect("register");

        // C buys for 500: generates 100 (level 1 -> b) + 50 (level 2 -> root)
        distribute(&mut conn, "c", 500.0, AffiliateEventType::PresalePurchase, "evt-1", 200)
            .expect("distribute");
        // B buys for 100: generates 20 (level 1 -> root)
        distribute(&mut conn, "b", 100.0, AffiliateEventType::PresalePurchase, "evt-2", 201)
            .expect("distribute");

        let t = tree(&conn, "root", 2).expect("tree");
        let node_b = &t.tree[0];
        // b sourced 20, its child c sourced 150
        assert!((node_b.subtree_commissions - 170.0).abs() < 1e-9);
        let node_c = &node_b.children[0];
        assert!((node_c.subtree_commissions - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_reference_omitted() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        register::register(&mut conn, "b", Some(&root.referral_code), 101).expect("register");

        // Orphan the edge: remove b's user record out from under it
        conn.execute("DELETE FROM users WHERE wallet = 'b'", [])
            .expect("delete");

        let t = tree(&conn, "root", 2).expect("tree");
        assert!(t.tree.is_empty());
        assert_eq!(t.total_network_size, 0);
    }

    #[test]
    fn test_circular_edges_terminate() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        register::register(&mut conn, "b", Some(&root.referral_code), 101).expect("register");

        // Malformed edge making root a "child" of b
        qtm_db::queries::ancestry::insert(&conn, "root", "b", 1, 102).expect("insert");

        let t = tree(&conn, "root", 5).expect("tree");
        // root itself is in the visited set, so the cycle is cut
        assert_eq!(t.total_network_size, 1);
        assert_eq!(t.tree[0].wallet, "b");
        assert!(t.tree[0].children.is_empty());
    }

    #[test]
    fn test_depth_zero_clamped() {
        let mut conn = test_db();
        let root = register::register(&mut conn, "root", None, 100).expect("register");
        register::register(&mut conn, "b", Some(&root.referral_code), 101).expect("register");

        let t = tree(&conn, "root", 0).expect("tree");
        assert_eq!(t.total_network_size, 1);
    }
}
