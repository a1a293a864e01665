//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC success response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Domain errors

    /// Record not found (-32001).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32001,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Commission level out of range (-32020).
    pub fn invalid_level(level: u8) -> Self {
        Self {
            code: -32020,
            message: "INVALID_LEVEL".to_string(),
            data: Some(serde_json::json!({"level": level})),
        }
    }

    /// Non-finite or negative amount (-32021).
    pub fn invalid_amount(amount: f64) -> Self {
        Self {
            code: -32021,
            message: "INVALID_AMOUNT".to_string(),
            data: Some(serde_json::json!({"amount": amount})),
        }
    }

    /// Commission status may only move forward (-32022).
    pub fn invalid_status_transition(detail: &str) -> Self {
        Self {
            code: -32022,
            message: "INVALID_STATUS_TRANSITION".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Presale is not accepting purchases (-32030).
    pub fn presale_inactive() -> Self {
        Self {
            code: -32030,
            message: "PRESALE_INACTIVE".to_string(),
            data: None,
        }
    }

    /// Purchase below the minimum token amount (-32031).
    pub fn below_minimum(tokens: u32, min: u32) -> Self {
        Self {
            code: -32031,
            message: "BELOW_MINIMUM_PURCHASE".to_string(),
            data: Some(serde_json::json!({"tokens": tokens, "min": min})),
        }
    }
}

impl From<qtm_db::DbError> for RpcError {
    fn from(err: qtm_db::DbError) -> Self {
        match err {
            qtm_db::DbError::NotFound(detail) => RpcError::not_found(&detail),
            qtm_db::DbError::InvalidInput(detail) => RpcError::invalid_status_transition(&detail),
            other => RpcError::internal_error(&format!("db error: {other}")),
        }
    }
}

impl From<qtm_affiliate::AffiliateError> for RpcError {
    fn from(err: qtm_affiliate::AffiliateError) -> Self {
        match err {
            qtm_affiliate::AffiliateError::InvalidAmount { amount } => {
                RpcError::invalid_amount(amount)
            }
            qtm_affiliate::AffiliateError::InvalidLevel { level } => RpcError::invalid_level(level),
            qtm_affiliate::AffiliateError::Db(db) => db.into(),
            other => RpcError::internal_error(&format!("affiliate error: {other}")),
        }
    }
}

impl From<qtm_presale::PresaleError> for RpcError {
    fn from(err: qtm_presale::PresaleError) -> Self {
        match err {
            qtm_presale::PresaleError::BelowMinimum { tokens, min } => {
                RpcError::below_minimum(tokens, min)
            }
            qtm_presale::PresaleError::Inactive => RpcError::presale_inactive(),
            qtm_presale::PresaleError::Db(db) => db.into(),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        "health" => commands::health(&state).await,

        // Affiliate commands
        "get_affiliate_config" => commands::affiliate::get_config(&state).await,
        "register_affiliate" => commands::affiliate::register(&state, &request.params).await,
        "get_affiliate_stats" => commands::affiliate::stats(&state, &request.params).await,
        "distribute_commission" => commands::affiliate::distribute(&state, &request.params).await,
        "get_commission_history" => commands::affiliate::history(&state, &request.params).await,
        "get_level_transactions" => {
            commands::affiliate::level_transactions(&state, &request.params).await
        }
        "get_affiliate_tree" => commands::affiliate::tree(&state, &request.params).await,
        "update_commission_status" => {
            commands::affiliate::update_status(&state, &request.params).await
        }

        // Presale commands
        "initiate_purchase" => commands::presale::initiate_purchase(&state, &request.params).await,
        "confirm_purchase" => commands::presale::confirm_purchase(&state, &request.params).await,
        "expire_purchase" => commands::presale::expire_purchase(&state, &request.params).await,
        "get_presale_progress" => commands::presale::progress(&state).await,
        "update_presale_config" => {
            commands::presale::update_config(&state, &request.params).await
        }

        // Notification commands
        "get_notifications" => commands::notifications::list(&state, &request.params).await,
        "mark_notifications_read" => {
            commands::notifications::mark_read(&state, &request.params).await
        }
        "clear_notifications" => commands::notifications::clear(&state, &request.params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
