pub mod config;
mod errors;
pub mod limiter;
pub mod resource;
pub mod retry;
pub mod service;
pub mod transport;

pub use config::{ConfigError, GatewayConfig};
pub use errors::{ClientBuildError, GatewayError, TransportError};
pub use limiter::ConcurrencyLimiter;
pub use resource::{RawDocument, ResourceKind, ResourceRequest};
pub use retry::{AttemptOutcome, BackoffReason, RetryPolicy, RetryState};
pub use service::{Gateway, GatewayBuilder};
pub use transport::{ReqwestTransport, UpstreamResponse, UpstreamTransport};
