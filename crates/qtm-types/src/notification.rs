//! User-facing notification records.

use serde::{Deserialize, Serialize};

use crate::Wallet;

/// Notification type emitted when a commission is credited.
pub const NOTIF_COMMISSION_RECEIVED: &str = "commission_received";

/// One stored notification. Delivery and read-state management beyond the
/// `read` flag are external concerns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub wallet: Wallet,
    pub notif_type: String,
    pub title: String,
    pub body: String,
    /// Structured payload, stored as JSON text.
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: u64,
}
