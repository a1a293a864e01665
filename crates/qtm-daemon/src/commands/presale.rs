//! Presale command handlers: purchase lifecycle, progress reporting, and
//! admin config updates.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use qtm_types::affiliate::AffiliateEventType;
use qtm_types::presale::{PaymentMethod, PurchaseRecord};

use crate::commands::{now, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Record a new purchase intent.
pub async fn initiate_purchase(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = params
        .get("wallet")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("wallet required"))?;
    let token_amount = params
        .get("token_amount")
        .and_then(|v| v.as_u64())
        .and_then(|t| u32::try_from(t).ok())
        .ok_or_else(|| RpcError::invalid_params("token_amount required"))?;
    let payment_method = params
        .get("payment_method")
        .and_then(|v| v.as_str())
        .and_then(PaymentMethod::parse)
        .ok_or_else(|| RpcError::invalid_params("payment_method must be card|crypto"))?;
    let referral_code = params.get("referral_code").and_then(|v| v.as_str());

    let db = state.db.lock().await;
    let purchase = qtm_presale::purchase::record_purchase(
        &db,
        wallet,
        token_amount,
        payment_method,
        referral_code,
        now(),
    )
    .map_err(RpcError::from)?;

    Ok(purchase_json(&purchase))
}

/// Confirm payment for a purchase: flip it to completed, bump the progress
/// counters, link the buyer under the checkout referral code, and pay the
/// upline.
///
/// Confirmations arrive at-least-once. The chain below is not atomic, so
/// every step must converge under redelivery: the completion step reports
/// an already-completed purchase instead of erroring, registration is a
/// no-op for a known wallet, and distribution dedups on the purchase id.
/// A retry after a crash mid-chain thus finishes the remaining steps.
pub async fn confirm_purchase(state: &Arc<DaemonState>, params: &Value) -> Result {
    let purchase_id = params
        .get("purchase_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("purchase_id required"))?;

    let mut db = state.db.lock().await;
    let confirmation =
        qtm_presale::purchase::confirm_purchase(&mut db, purchase_id).map_err(RpcError::from)?;
    let purchase = confirmation.purchase;

    // Link the buyer under the code supplied at checkout. A no-op for
    // wallets that already registered.
    qtm_affiliate::register::register(
        &mut db,
        &purchase.wallet,
        purchase.referral_code.as_deref(),
        now(),
    )
    .map_err(RpcError::from)?;

    let outcome = qtm_affiliate::distribute::distribute(
        &mut db,
        &purchase.wallet,
        purchase.amount_usd,
        AffiliateEventType::PresalePurchase,
        &purchase.purchase_id,
        now(),
    )
    .map_err(RpcError::from)?;
    drop(db);

    if confirmation.newly_completed {
        state.progress_cache.lock().await.invalidate();
    }

    Ok(serde_json::json!({
        "success": true,
        "purchase": purchase_json(&purchase),
        "newly_completed": confirmation.newly_completed,
        "commissions_created": outcome.entries_created,
        "total_distributed": outcome.total_distributed,
    }))
}

/// Mark an abandoned card session as expired.
pub async fn expire_purchase(state: &Arc<DaemonState>, params: &Value) -> Result {
    let purchase_id = params
        .get("purchase_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("purchase_id required"))?;

    let db = state.db.lock().await;
    let purchase =
        qtm_presale::purchase::expire_purchase(&db, purchase_id).map_err(RpcError::from)?;

    Ok(purchase_json(&purchase))
}

/// Presale progress snapshot, served from the TTL cache.
pub async fn progress(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let mut cache = state.progress_cache.lock().await;
    let progress = cache.get(&db, now()).map_err(RpcError::from)?;

    serde_json::to_value(&progress)
        .map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))
}

/// Admin update of the presale counters and active flag.
pub async fn update_config(state: &Arc<DaemonState>, params: &Value) -> Result {
    let total_raised = params.get("total_raised").and_then(|v| v.as_f64());
    let goal = params.get("goal").and_then(|v| v.as_f64());
    let is_active = params.get("is_active").and_then(|v| v.as_bool());

    if total_raised.is_none() && goal.is_none() && is_active.is_none() {
        return Err(RpcError::invalid_params(
            "at least one of total_raised, goal, is_active required",
        ));
    }
    if let Some(raised) = total_raised {
        if !raised.is_finite() || raised < 0.0 {
            return Err(RpcError::invalid_amount(raised));
        }
    }
    if let Some(goal) = goal {
        if !goal.is_finite() || goal <= 0.0 {
            return Err(RpcError::invalid_amount(goal));
        }
    }

    let db = state.db.lock().await;
    qtm_db::queries::presale::update_state(&db, total_raised, goal, is_active)
        .map_err(RpcError::from)?;
    let fresh = qtm_presale::progress::progress(&db).map_err(RpcError::from)?;
    drop(db);

    state.progress_cache.lock().await.invalidate();
    info!(?total_raised, ?goal, ?is_active, "presale config updated");

    serde_json::to_value(&fresh)
        .map_err(|e| RpcError::internal_error(&format!("serialize error: {e}")))
}

/// Serialize a purchase record in the wire shape.
fn purchase_json(purchase: &PurchaseRecord) -> Value {
    serde_json::json!({
        "purchase_id": purchase.purchase_id,
        "wallet": purchase.wallet,
        "token_amount": purchase.token_amount,
        "amount_usd": purchase.amount_usd,
        "payment_method": purchase.payment_method.as_str(),
        "referral_code": purchase.referral_code,
        "status": purchase.status.as_str(),
        "created_at": purchase.created_at,
    })
}
