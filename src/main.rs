//! Focus Keeper - A focus-timer daemon with local and remote state reconciliation
//! 
//! This is the main entry point for the focus-keeper application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use focus_keeper::{
    api::create_router,
    config::Config,
    state::AppState,
    tasks::TimerRuntime,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-keeper server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, focus={}min, state_dir={}",
          config.host, config.port, config.focus_minutes, config.state_dir.display());

    // Create application state and reconcile persisted timer state
    let (state, worker) = AppState::from_config(&config)?;
    let state = Arc::new(state);
    let runtime = TimerRuntime::start(Arc::clone(&state), worker).await;

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer            - Current timer state");
    info!("  POST /timer/start      - Start a focus session");
    info!("  POST /timer/pause      - Pause the running period");
    info!("  POST /timer/resume     - Resume a paused period");
    info!("  POST /timer/stop       - Stop the current period");
    info!("  POST /timer/break      - Start a break");
    info!("  GET  /timer/events     - Stream timer updates");
    info!("  POST /lifecycle/:event - Client hidden/unload hooks");
    info!("  GET  /stats            - Session statistics");
    info!("  GET  /status           - Daemon status");
    info!("  GET  /health           - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Flush both stores before exiting
    runtime.dispose().await;

    info!("Server shutdown complete");
    Ok(())
}
