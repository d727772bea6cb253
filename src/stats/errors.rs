use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatsError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No player id in search result for '{0}'")]
    UnresolvedPlayer(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
