use thiserror::Error;

use super::ResourceKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("{kind} '{id}' not found upstream")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Upstream rejected the API credential")]
    Unauthorized,

    #[error("Rate limited by upstream after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Upstream server error {status} after {attempts} attempts")]
    TransientServerError { status: u16, attempts: u32 },

    #[error("Upstream request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Network error after {attempts} attempts: {message}")]
    Network { message: String, attempts: u32 },

    #[error("Unexpected upstream status {status} after {attempts} attempts")]
    UnexpectedStatus { status: u16, attempts: u32 },

    #[error("Malformed response for {kind}: {reason}")]
    MalformedResponse { kind: ResourceKind, reason: String },

    #[error("Gateway is closed")]
    Closed,
}

impl GatewayError {
    /// Errors that came from the retry budget running out
    pub fn is_exhausted_retry(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::TransientServerError { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::Network { .. }
                | GatewayError::UnexpectedStatus { .. }
        )
    }
}

/// Failure below the HTTP layer, reported by a transport
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Failure to set up the upstream HTTP client
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("Invalid upstream base URL '{0}'")]
    BaseUrl(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
