//! Presale purchase records and progress shapes.

use serde::{Deserialize, Serialize};

use crate::Wallet;

/// How a purchase is being paid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted card checkout session.
    Card,
    /// Manual SOL/USDC transfer, confirmed off-band by an operator.
    Crypto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(Self::Card),
            "crypto" => Some(Self::Crypto),
            _ => None,
        }
    }
}

/// Lifecycle of a purchase record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Session created, payment not yet confirmed.
    Initiated,
    /// Payment confirmed; commissions have been distributed.
    Completed,
    /// Card session expired without payment.
    Expired,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(Self::Initiated),
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// One presale purchase / payment transaction record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Internal purchase id; doubles as the commission event id.
    pub purchase_id: String,
    pub wallet: Wallet,
    pub token_amount: u32,
    pub amount_usd: f64,
    pub payment_method: PaymentMethod,
    /// Referral code supplied at checkout, if any.
    pub referral_code: Option<String>,
    pub status: PurchaseStatus,
    pub created_at: u64,
}

/// Public presale progress snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresaleProgress {
    pub total_raised: f64,
    pub goal: f64,
    pub progress_percentage: f64,
    pub remaining: f64,
    pub participants: u32,
    pub is_active: bool,
}
