use std::sync::Arc;

use statsgate::{
    cache::{start_cache_maintenance, CacheMaintenanceConfig},
    gateway::{Gateway, GatewayConfig, ReqwestTransport},
    AppState, StatsService,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statsgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting statsgate");

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return;
        }
    };
    info!(config = ?config, "Loaded gateway configuration");

    let transport = match ReqwestTransport::new(&config) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            error!(error = %err, "Failed to build upstream HTTP client");
            return;
        }
    };

    let gateway = Arc::new(Gateway::builder(transport, &config).build());
    let maintenance = tokio::spawn(start_cache_maintenance(
        gateway.cache(),
        CacheMaintenanceConfig::default(),
    ));

    let stats_service = StatsService::builder(gateway.clone())
        .with_game_id(config.game_id.clone())
        .build();
    let app = statsgate::app(AppState::new(Arc::new(stats_service)));

    let bind_addr = std::env::var("STATS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(bind_addr = %bind_addr, error = %err, "Failed to bind listener");
            return;
        }
    };
    info!("Server running on http://{}", bind_addr);

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "Server error");
    }

    maintenance.abort();
    gateway.close().await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        // Keep serving; the process can still be killed externally
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
