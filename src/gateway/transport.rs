use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use super::{ClientBuildError, GatewayConfig, ResourceKind, ResourceRequest, TransportError};

/// Status and body of an upstream HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for sending a single request upstream.
///
/// Implementations perform exactly one network exchange; retrying,
/// caching and concurrency limits belong to the gateway.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, request: &ResourceRequest) -> Result<UpstreamResponse, TransportError>;
}

/// HTTP transport against the upstream Data API
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    api_key: String,
    game_id: String,
}

impl ReqwestTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, ClientBuildError> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientBuildError::BaseUrl(config.base_url.clone()))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("statsgate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key().to_string(),
            game_id: config.game_id.clone(),
        })
    }

    /// Full URL and query for a request. Ids are percent-encoded as one
    /// path segment each.
    fn endpoint(&self, request: &ResourceRequest) -> (Url, Vec<(String, String)>) {
        let id = request.id.as_str();
        let game = self.game_id.as_str();
        let (segments, mut query): (Vec<&str>, Vec<(String, String)>) = match request.kind {
            ResourceKind::PlayerSearch => {
                (vec!["players"], vec![("nickname".to_string(), id.to_string())])
            }
            ResourceKind::Profile => (vec!["players", id], vec![]),
            ResourceKind::AggregateStats => (vec!["players", id, "stats", game], vec![]),
            ResourceKind::MatchHistory => (
                vec!["players", id, "history"],
                vec![("game".to_string(), game.to_string())],
            ),
            ResourceKind::MatchDetail => (vec!["matches", id], vec![]),
            ResourceKind::MatchStats => (vec!["matches", id, "stats"], vec![]),
        };

        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        query.extend(
            request
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        (url, query)
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(kind = %request.kind, id = %request.id))]
    async fn send(&self, request: &ResourceRequest) -> Result<UpstreamResponse, TransportError> {
        let (url, query) = self.endpoint(request);
        debug!(url = %url, "Dispatching upstream request");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        debug!(status, body_len = body.len(), "Upstream responded");
        Ok(UpstreamResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(e.to_string())
    }
}
