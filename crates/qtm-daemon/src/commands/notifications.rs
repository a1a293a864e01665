//! Notification command handlers.

use std::sync::Arc;

use serde_json::Value;

use qtm_db::queries::notifications;

use crate::commands::Result;
use crate::rpc::RpcError;
use crate::DaemonState;

/// List a wallet's notifications, newest first, with the unread count.
pub async fn list(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;

    let db = state.db.lock().await;
    let items = notifications::list(&db, wallet).map_err(RpcError::from)?;
    let unread = notifications::unread_count(&db, wallet).map_err(RpcError::from)?;

    let items: Vec<Value> = items
        .iter()
        .map(|n| {
            serde_json::json!({
                "id": n.id,
                "type": n.notif_type,
                "title": n.title,
                "body": n.body,
                "payload": n.payload,
                "read": n.read,
                "created_at": n.created_at,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "wallet": wallet,
        "notifications": items,
        "unread_count": unread,
    }))
}

/// Mark all of a wallet's notifications as read.
pub async fn mark_read(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;

    let db = state.db.lock().await;
    let updated = notifications::mark_all_read(&db, wallet).map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "success": true,
        "updated": updated,
    }))
}

/// Delete all of a wallet's notifications.
pub async fn clear(state: &Arc<DaemonState>, params: &Value) -> Result {
    let wallet = require_wallet(params)?;

    let db = state.db.lock().await;
    let deleted = notifications::clear(&db, wallet).map_err(RpcError::from)?;

    Ok(serde_json::json!({
        "success": true,
        "deleted": deleted,
    }))
}

fn require_wallet(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("wallet")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("wallet required"))
}
