use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tracing::{debug, error, info, instrument, warn};

use super::{
    AttemptOutcome, ConcurrencyLimiter, GatewayConfig, GatewayError, RawDocument, ResourceKind,
    ResourceRequest, RetryPolicy, RetryState, TransportError, UpstreamTransport,
};
use crate::cache::{CacheStore, InMemoryCacheStore, TtlPolicy};

/// Cache-aside, rate-limited access to the upstream statistics API
pub struct Gateway {
    transport: Arc<dyn UpstreamTransport>,
    cache: Arc<dyn CacheStore>,
    limiter: ConcurrencyLimiter,
    ttl: TtlPolicy,
    retry: RetryPolicy,
    request_timeout: Duration,
    politeness_delay: Duration,
}

impl Gateway {
    pub fn builder(transport: Arc<dyn UpstreamTransport>, config: &GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(transport, config)
    }

    pub fn cache(&self) -> Arc<dyn CacheStore> {
        self.cache.clone()
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetches one upstream resource, serving from cache when possible
    pub async fn fetch(
        &self,
        kind: ResourceKind,
        id: &str,
        params: BTreeMap<String, String>,
    ) -> Result<RawDocument, GatewayError> {
        self.fetch_request(ResourceRequest::new(kind, id).with_params(params))
            .await
    }

    #[instrument(skip(self, request), fields(kind = %request.kind, id = %request.id))]
    pub async fn fetch_request(&self, request: ResourceRequest) -> Result<RawDocument, GatewayError> {
        if self.limiter.is_closed() {
            return Err(GatewayError::Closed);
        }

        let key = request.cache_key();
        if let Some(document) = self.cache.get(&key).await {
            debug!(key = %key, "Cache hit");
            return Ok(document);
        }
        debug!(key = %key, "Cache miss");

        // Held until this call returns, whatever the outcome
        let _permit = self.limiter.acquire().await?;

        let mut state = RetryState::start();
        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    if !self.politeness_delay.is_zero() {
                        tokio::time::sleep(self.politeness_delay).await;
                    }
                    let outcome = self.attempt(&request).await;
                    self.retry.next_state(&request, attempt, outcome)
                }
                RetryState::BackingOff {
                    attempt,
                    reason,
                    delay,
                } => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        reason = ?reason,
                        delay_secs = delay.as_secs_f64(),
                        "Upstream attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Success(document) => {
                    let ttl = self.ttl.ttl_for(request.kind);
                    self.cache.set(&key, document.clone(), ttl).await;
                    return Ok(document);
                }
                RetryState::Terminal(err) => {
                    log_terminal(&request, &err);
                    return Err(err);
                }
            };
        }
    }

    /// One network exchange bounded by the per-call timeout
    async fn attempt(&self, request: &ResourceRequest) -> AttemptOutcome {
        match tokio::time::timeout(self.request_timeout, self.transport.send(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => AttemptOutcome::Timeout,
            Ok(Err(TransportError::Connection(message))) => AttemptOutcome::Network(message),
            Ok(Ok(response)) => {
                debug!(status = response.status, "Upstream attempt completed");
                AttemptOutcome::from_status(response.status, &response.body)
            }
        }
    }

    /// Cache-only lookup for the param-less key of `(kind, id)`
    pub async fn get_raw_cached(&self, kind: ResourceKind, id: &str) -> Option<RawDocument> {
        self.get_raw_cached_with(kind, id, BTreeMap::new()).await
    }

    pub async fn get_raw_cached_with(
        &self,
        kind: ResourceKind,
        id: &str,
        params: BTreeMap<String, String>,
    ) -> Option<RawDocument> {
        let key = ResourceRequest::new(kind, id).with_params(params).cache_key();
        self.cache.get(&key).await
    }

    /// Drops every cached document scoped to a player, whatever its params
    #[instrument(skip(self))]
    pub async fn invalidate_entity(&self, entity_id: &str) -> usize {
        let mut removed = 0;
        for kind in ResourceKind::iter().filter(|kind| kind.is_entity_scoped()) {
            removed += self
                .cache
                .invalidate_prefix(&ResourceRequest::entity_prefix(kind, entity_id))
                .await;
        }
        info!(entity_id = %entity_id, removed, "Invalidated cached entity data");
        removed
    }

    /// Rejects further fetches and drops cached data
    pub async fn close(&self) {
        self.limiter.close();
        self.cache.clear().await;
        info!("Gateway closed");
    }
}

fn log_terminal(request: &ResourceRequest, err: &GatewayError) {
    match err {
        GatewayError::Unauthorized => error!(
            kind = %request.kind,
            "Upstream rejected the API credential; check STATS_API_KEY (configuration-fatal)"
        ),
        GatewayError::NotFound { .. } => {
            debug!(kind = %request.kind, id = %request.id, "Resource not found upstream")
        }
        GatewayError::MalformedResponse { reason, .. } => {
            warn!(kind = %request.kind, id = %request.id, reason = %reason, "Malformed upstream body")
        }
        other => warn!(
            kind = %request.kind,
            id = %request.id,
            error = %other,
            "Upstream call failed after exhausting retries"
        ),
    }
}

pub struct GatewayBuilder {
    transport: Arc<dyn UpstreamTransport>,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: TtlPolicy,
    max_concurrency: usize,
    retry: RetryPolicy,
    request_timeout: Duration,
    politeness_delay: Duration,
}

impl GatewayBuilder {
    fn new(transport: Arc<dyn UpstreamTransport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            cache: None,
            ttl: TtlPolicy::default(),
            max_concurrency: config.max_concurrency,
            retry: config.retry.clone(),
            request_timeout: config.request_timeout,
            politeness_delay: config.politeness_delay,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            transport: self.transport,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(InMemoryCacheStore::new())),
            limiter: ConcurrencyLimiter::new(self.max_concurrency),
            ttl: self.ttl,
            retry: self.retry,
            request_timeout: self.request_timeout,
            politeness_delay: self.politeness_delay,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::{quiet_config, ScriptedTransport};
    use super::*;
    use crate::gateway::UpstreamResponse;
    use tokio::time::Instant;

    fn gateway(transport: Arc<ScriptedTransport>, config: &GatewayConfig) -> Gateway {
        Gateway::builder(transport, config).build()
    }

    #[tokio::test]
    async fn success_is_cached_and_served_without_network() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 200, r#"{"nickname":"alice"}"#);
        let gateway = gateway(transport.clone(), &quiet_config());

        let first = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await
            .unwrap();
        let second = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.calls(ResourceKind::Profile, "p1"), 1);
        assert!(gateway
            .get_raw_cached(ResourceKind::Profile, "p1")
            .await
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_sleeps_before_retrying() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            ResourceKind::AggregateStats,
            "p1",
            vec![
                Ok(UpstreamResponse::new(429, "")),
                Ok(UpstreamResponse::new(200, r#"{"lifetime":{}}"#)),
            ],
        );
        let gateway = gateway(transport.clone(), &quiet_config());

        let started = Instant::now();
        let result = gateway
            .fetch(ResourceKind::AggregateStats, "p1", BTreeMap::new())
            .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(transport.calls(ResourceKind::AggregateStats, "p1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_never_exceed_retry_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::AggregateStats, "p1", 429, "");
        let gateway = gateway(transport.clone(), &quiet_config());

        let result = gateway
            .fetch(ResourceKind::AggregateStats, "p1", BTreeMap::new())
            .await;

        assert_eq!(result, Err(GatewayError::RateLimited { attempts: 3 }));
        assert_eq!(transport.calls(ResourceKind::AggregateStats, "p1"), 3);
    }

    #[tokio::test]
    async fn not_found_is_neither_retried_nor_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "ghost", 404, "");
        let gateway = gateway(transport.clone(), &quiet_config());

        for _ in 0..2 {
            let result = gateway
                .fetch(ResourceKind::Profile, "ghost", BTreeMap::new())
                .await;
            assert!(matches!(result, Err(GatewayError::NotFound { .. })));
        }

        assert_eq!(transport.calls(ResourceKind::Profile, "ghost"), 2);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 401, "");
        let gateway = gateway(transport.clone(), &quiet_config());

        let result = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await;

        assert_eq!(result, Err(GatewayError::Unauthorized));
        assert_eq!(transport.calls(ResourceKind::Profile, "p1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_retry_with_short_backoff() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 503, "");
        let gateway = gateway(transport.clone(), &quiet_config());

        let started = Instant::now();
        let result = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await;

        assert_eq!(
            result,
            Err(GatewayError::TransientServerError {
                status: 503,
                attempts: 3
            })
        );
        // 1s after the first failure, 2s after the second
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_surfaces_timeout() {
        let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_secs(30)));
        transport.respond(ResourceKind::Profile, "p1", 200, "{}");
        let config = quiet_config().with_request_timeout(Duration::from_secs(5));
        let gateway = gateway(transport.clone(), &config);

        let result = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await;

        assert_eq!(result, Err(GatewayError::Timeout { attempts: 3 }));
        assert_eq!(transport.calls(ResourceKind::Profile, "p1"), 3);
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_terminal_and_uncached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::AggregateStats, "p1", 200, "<html>oops</html>");
        let gateway = gateway(transport.clone(), &quiet_config());

        let result = gateway
            .fetch(ResourceKind::AggregateStats, "p1", BTreeMap::new())
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::MalformedResponse { .. })
        ));
        assert_eq!(transport.calls(ResourceKind::AggregateStats, "p1"), 1);
        assert!(gateway
            .get_raw_cached(ResourceKind::AggregateStats, "p1")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn permits_are_released_after_failures() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 404, "");
        let config = quiet_config().with_max_concurrency(1);
        let gateway = gateway(transport.clone(), &config);

        let _ = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await;

        assert_eq!(gateway.limiter().available(), 1);
    }

    #[tokio::test]
    async fn invalidate_entity_drops_all_player_scoped_entries() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 200, "{}");
        transport.respond(ResourceKind::AggregateStats, "p1", 200, "{}");
        transport.respond(ResourceKind::MatchHistory, "p1", 200, "{}");
        transport.respond(ResourceKind::MatchDetail, "m1", 200, "{}");
        let gateway = gateway(transport.clone(), &quiet_config());

        for kind in [
            ResourceKind::Profile,
            ResourceKind::AggregateStats,
            ResourceKind::MatchHistory,
        ] {
            gateway.fetch(kind, "p1", BTreeMap::new()).await.unwrap();
        }
        gateway
            .fetch_request(
                ResourceRequest::new(ResourceKind::MatchHistory, "p1").with_param("offset", "20"),
            )
            .await
            .unwrap();
        gateway
            .fetch(ResourceKind::MatchDetail, "m1", BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(gateway.invalidate_entity("p1").await, 4);
        assert!(gateway
            .get_raw_cached(ResourceKind::MatchDetail, "m1")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn closed_gateway_rejects_fetches() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(ResourceKind::Profile, "p1", 200, "{}");
        let gateway = gateway(transport.clone(), &quiet_config());
        gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await
            .unwrap();

        gateway.close().await;

        let result = gateway
            .fetch(ResourceKind::Profile, "p1", BTreeMap::new())
            .await;
        assert_eq!(result, Err(GatewayError::Closed));
        assert_eq!(transport.calls(ResourceKind::Profile, "p1"), 1);
    }
}
