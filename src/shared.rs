use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;
use crate::stats::{StatsError, StatsService};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub stats_service: Arc<StatsService>,
}

impl AppState {
    pub fn new(stats_service: Arc<StatsService>) -> Self {
        Self { stats_service }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Validation(msg) => AppError::BadRequest(msg),
            StatsError::UnresolvedPlayer(_) => AppError::NotFound(err.to_string()),
            StatsError::Gateway(GatewayError::NotFound { .. }) => {
                AppError::NotFound(err.to_string())
            }
            StatsError::Gateway(other) => {
                error!(error = %other, "Upstream statistics unavailable");
                AppError::ServiceUnavailable
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
