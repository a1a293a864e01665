//! Affiliate command handlers: registration, stats, distribution, history,
//! tree, and ledger status updates.

use std::sync::Arc;

use serde_json::Value;

use qtm_types::affiliate::{AffiliateEventType, CommissionEntry, CommissionStatus};

use crate::commands::{now, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Expose the rate table and registration constants.
pub async fn get_config(_state: &Arc<DaemonState>) -> Result {
    let table = qtm_affiliate::rates::table();
    serde_json::to_value(&table)
        .map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))
}

/// Register a wallet, optionally under a sponsor's referral code.
pub async fn register(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;
    let referral_code_used = params.get("referral_code_used").and_then(|v| v.as_str());

    let mut db = state.db.lock().await;
    let user = qtm_affiliate::register::register(&mut db, wallet, referral_code_used, now())
        .map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "wallet": user.wallet,
        "referral_code": user.referral_code,
        "referral_link": state.config.referral_link(&user.referral_code),
        "sponsor_wallet": user.sponsor_wallet,
        "created_at": user.created_at,
    }))
}

/// Recomputed per-level stats for a wallet.
pub async fn stats(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;

    let mut db = state.db.lock().await;
    let stats = qtm_affiliate::stats::stats(&mut db, wallet, now()).map_err(RpcError::from)?;

    let mut value = serde_json::to_value(&stats)
        .map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "referral_link".to_string(),
            Value::String(state.config.referral_link(&stats.referral_code)),
        );
    }
    Ok(value)
}

/// Distribute commissions for a revenue event up the source's upline.
pub async fn distribute(state: &Arc<DaemonState>, params: &Value) -> Result {
    let source_wallet = params
        .get("source_wallet")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("source_wallet required"))?;
    let amount = params
        .get("amount")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| RpcError::invalid_params("amount required"))?;
    let event_id = params
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("event_id required"))?;
    let event_type = params
        .get("event_type")
        .and_then(|v| v.as_str())
        .map(AffiliateEventType::parse)
        .unwrap_or(AffiliateEventType::Other);

    let mut db = state.db.lock().await;
    let outcome = qtm_affiliate::distribute::distribute(
        &mut db,
        source_wallet,
        amount,
        event_type,
        event_id,
        now(),
    )
    .map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "success": true,
        "commissions_created": outcome.entries_created,
        "total_distributed": outcome.total_distributed,
    }))
}

/// Paginated commission history for a beneficiary, newest first.
pub async fn history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;
    let (limit, offset) = page_params(params);

    let db = state.db.lock().await;
    let page = qtm_affiliate::history::commission_history(&db, wallet, limit, offset)
        .map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "wallet": page.wallet,
        "commissions": commissions_json(&page.commissions),
        "total_count": page.total_count,
        "limit": limit,
        "offset": offset,
    }))
}

/// Ledger entries for a beneficiary at one specific level.
pub async fn level_transactions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;
    let level = params
        .get("level")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("level required"))?;
    let level = u8::try_from(level).map_err(|_| RpcError::invalid_level(u8::MAX))?;
    let (limit, offset) = page_params(params);

    let db = state.db.lock().await;
    let page = qtm_affiliate::history::level_transactions(&db, wallet, level, limit, offset)
        .map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "wallet": page.wallet,
        "level": page.level,
        "commission_rate": page.commission_rate,
        "transactions": commissions_json(&page.transactions),
        "total_count": page.total_count,
        "total_amount": page.total_amount,
        "limit": limit,
        "offset": offset,
    }))
}

/// Downline referral tree, depth-limited.
pub async fn tree(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;
    let max_depth = params
        .get("max_depth")
        .and_then(|v| v.as_u64())
        .map(|d| u8::try_from(d).unwrap_or(qtm_affiliate::tree::MAX_TREE_DEPTH))
        .unwrap_or(qtm_affiliate::tree::DEFAULT_TREE_DEPTH);

    let db = state.db.lock().await;
    let tree = qtm_affiliate::tree::tree(&db, wallet, max_depth).map_err(RpcError::from)?;

    serde_json::to_value(&tree)
        .map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))
}

/// Move a ledger entry forward in the settlement lifecycle.
pub async fn update_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = params
        .get("commission_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("commission_id required"))?;
    let status_str = params
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("status required"))?;
    let status = CommissionStatus::parse(status_str)
        .ok_or_else(|| RpcError::invalid_params("status must be pending|confirmed|paid"))?;

    let db = state.db.lock().await;
    qtm_db::queries::ledger::update_status(&db, id, status).map_err(RpcError::from)?;
    let entry = qtm_db::queries::ledger::get(&db, id).map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "success": true,
        "commission_id": entry.id,
        "status": entry.status.as_str(),
    }))
}

/// Extract the required `wallet` parameter.
fn require_wallet(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("wallet")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("wallet required"))
}

/// Extract optional pagination parameters with defaults.
fn page_params(params: &Value) -> (u32, u32) {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| u32::try_from(l).unwrap_or(qtm_affiliate::history::DEFAULT_PAGE_SIZE))
        .unwrap_or(qtm_affiliate::history::DEFAULT_PAGE_SIZE);
    let offset = params
        .get("offset")
        .and_then(|v| v.as_u64())
        .map(|o| u32::try_from(o).unwrap_or(0))
        .unwrap_or(0);
    (limit, offset)
}

/// Serialize ledger entries in the wire shape.
fn commissions_json(entries: &[CommissionEntry]) -> Vec<Value> {
    entries
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "source_wallet": c.source_wallet,
                "beneficiary_wallet": c.beneficiary_wallet,
                "level": c.level,
                "percentage": c.percentage,
                "amount": c.amount,
                "event_type": c.event_type.as_str(),
                "event_id": c.event_id,
                "status": c.status.as_str(),
                "created_at": c.created_at,
            })
        })
        .collect()
}
