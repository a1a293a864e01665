//! qtm-daemon: the presale and affiliate backend daemon.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use qtm_presale::progress::ProgressCache;

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// TTL cache for the presale progress snapshot.
    pub progress_cache: Arc<tokio::sync::Mutex<ProgressCache>>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qtm=info".parse()?),
        )
        .init();

    info!("Qtm daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("presale.db");
    let conn = qtm_db::open(&db_path)?;
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 4. Build daemon state
    let progress_cache = ProgressCache::new(config.presale.progress_ttl_secs);
    let state = Arc::new(DaemonState {
        db,
        config,
        progress_cache: Arc::new(tokio::sync::Mutex::new(progress_cache)),
        shutdown_tx: shutdown_tx.clone(),
    });

    // 5. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
