// Library crate for the statsgate API gateway
// This file exposes the public API for integration tests

pub mod cache;
pub mod gateway;
pub mod shared;
pub mod stats;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use cache::{CacheStore, InMemoryCacheStore, TtlPolicy};
pub use gateway::{
    Gateway, GatewayConfig, GatewayError, ResourceKind, UpstreamResponse, UpstreamTransport,
};
pub use shared::{AppError, AppState};
pub use stats::{NormalizedStats, StatsError, StatsService};

/// Full HTTP surface: health check plus the player routes
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/players", stats::handlers::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
