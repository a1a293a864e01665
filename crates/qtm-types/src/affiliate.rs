//! Affiliate domain structures: users, ancestry edges, ledger entries,
//! and the aggregated stats shapes returned to callers.

use serde::{Deserialize, Serialize};

use crate::Wallet;

/// One registered participant of the affiliate program.
///
/// Immutable after creation: the referral code is allocated once and the
/// sponsor link is never re-pointed, even if a later registration call
/// supplies a different code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub wallet: Wallet,
    pub referral_code: String,
    /// Wallet of the direct (level-1) sponsor, if any.
    pub sponsor_wallet: Option<Wallet>,
    pub created_at: u64,
}

/// A directed edge linking a user to one of its upline sponsors.
///
/// For a fixed user, levels are contiguous starting at 1; the level-L
/// ancestor is the sponsor of the level-(L-1) ancestor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AncestryEdge {
    pub wallet: Wallet,
    pub ancestor_wallet: Wallet,
    pub level: u8,
    pub created_at: u64,
}

/// One immutable commission payout unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub id: String,
    /// The purchaser whose event generated this commission.
    pub source_wallet: Wallet,
    /// The upline member who earns it.
    pub beneficiary_wallet: Wallet,
    pub level: u8,
    /// Rate applied, expressed 0-100.
    pub percentage: f64,
    /// `percentage / 100 * net amount`, in USD.
    pub amount: f64,
    pub event_type: AffiliateEventType,
    /// External correlation key (checkout session id or purchase id).
    pub event_id: String,
    pub status: CommissionStatus,
    pub created_at: u64,
}

/// Commission settlement status. Forward-only: pending -> confirmed -> paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Confirmed,
    Paid,
}

impl CommissionStatus {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Paid => 2,
        }
    }

    /// Whether moving to `next` respects the forward-only progression.
    pub fn can_transition_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

/// Category of the revenue event that triggered a distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffiliateEventType {
    PresalePurchase,
    Deposit,
    TradeFee,
    Other,
}

impl AffiliateEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PresalePurchase => "presale_purchase",
            Self::Deposit => "deposit",
            Self::TradeFee => "trade_fee",
            Self::Other => "other",
        }
    }

    /// Parse the stored string form. Unknown strings fold into `Other`;
    /// the event type is descriptive, not behavioral.
    pub fn parse(s: &str) -> Self {
        match s {
            "presale_purchase" => Self::PresalePurchase,
            "deposit" => Self::Deposit,
            "trade_fee" => Self::TradeFee,
            _ => Self::Other,
        }
    }
}

/// Per-level slice of an affiliate's stats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: u8,
    /// Downline members sitting exactly `level` hops below this wallet.
    pub referral_count: u32,
    pub total_commission: f64,
    pub pending_commission: f64,
    pub confirmed_commission: f64,
    pub paid_commission: f64,
}

/// Full recomputed stats for one wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AffiliateStats {
    pub wallet: Wallet,
    pub referral_code: String,
    pub total_referrals: u32,
    pub total_earnings: f64,
    pub pending_earnings: f64,
    pub confirmed_earnings: f64,
    pub paid_earnings: f64,
    /// Always 5 entries, levels 1..=5.
    pub levels: Vec<LevelStats>,
}

/// One node of the downline referral tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeNode {
    pub wallet: Wallet,
    pub referral_code: String,
    pub direct_referrals: u32,
    /// Commission amounts generated by purchases within this node's
    /// subtree (the node's own sourced events plus its descendants').
    pub subtree_commissions: f64,
    pub children: Vec<TreeNode>,
}

/// The downline forest for one wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralTree {
    pub wallet: Wallet,
    pub tree: Vec<TreeNode>,
    pub total_network_size: u32,
}
