//! JSON-RPC command handlers, grouped by domain.

pub mod affiliate;
pub mod notifications;
pub mod presale;

use std::sync::Arc;

use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

pub type Result = std::result::Result<Value, RpcError>;

/// Current Unix time in seconds.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Liveness probe: verifies the database answers a trivial query.
pub async fn health(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let db_ok: std::result::Result<i64, _> =
        db.query_row("SELECT 1", [], |row| row.get(0));

    Ok(serde_json::json!({
        "status": "healthy",
        "database": if db_ok.is_ok() { "connected" } else { "unavailable" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
