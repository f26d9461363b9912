use std::{net::SocketAddr, sync::Arc};

use listenroom::{
    common::{AnyResult, logger},
    configs::Config,
    metadata,
    room::RoomRegistry,
    server::AppState,
    transport,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let (config, config_path) = Config::load()?;
    logger::init(&config.logging);
    info!("Loaded configuration from {}", config_path);

    let resolver = metadata::from_config(&config.metadata);
    let registry = RoomRegistry::new(resolver, config.playback.timing());
    let address = config.server.address();
    let ws_path = config.server.route_path();
    let state = Arc::new(AppState::new(config, registry));

    let app = transport::app(state.clone());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        "listenroom {} listening on {} (websocket path {})",
        env!("CARGO_PKG_VERSION"),
        address,
        ws_path
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Waits for Ctrl-C, then closes every room so open sockets drain.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    state.registry.shutdown().await;
}
