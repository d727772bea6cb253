use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use statsgate::gateway::{
    ResourceKind, ResourceRequest, TransportError, UpstreamResponse, UpstreamTransport,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

type Reply = Result<UpstreamResponse, TransportError>;

/// Upstream stand-in that replays scripted replies per resource.
///
/// The last reply in a script repeats; unknown resources answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<RwLock<HashMap<String, VecDeque<Reply>>>>,
    calls: Arc<RwLock<HashMap<String, usize>>>,
    received: Arc<RwLock<Vec<ResourceRequest>>>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn key(kind: ResourceKind, id: &str) -> String {
        format!("{}:{}", kind, id)
    }

    pub async fn script(&self, kind: ResourceKind, id: &str, replies: Vec<Reply>) {
        self.scripts
            .write()
            .await
            .insert(Self::key(kind, id), replies.into());
    }

    pub async fn respond(&self, kind: ResourceKind, id: &str, status: u16, body: &str) {
        self.script(kind, id, vec![Ok(UpstreamResponse::new(status, body))])
            .await;
    }

    pub async fn calls(&self, kind: ResourceKind, id: &str) -> usize {
        self.calls
            .read()
            .await
            .get(&Self::key(kind, id))
            .copied()
            .unwrap_or_default()
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.values().sum()
    }

    pub async fn received(&self) -> Vec<ResourceRequest> {
        self.received.read().await.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn next_reply(&self, key: &str) -> Reply {
        let mut scripts = self.scripts.write().await;
        match scripts.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(UpstreamResponse::new(404, ""))),
            None => Ok(UpstreamResponse::new(404, "")),
        }
    }
}

/// Decrements the in-flight counter even if the call is cancelled
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UpstreamTransport for MockTransport {
    async fn send(&self, request: &ResourceRequest) -> Result<UpstreamResponse, TransportError> {
        let key = Self::key(request.kind, &request.id);
        *self.calls.write().await.entry(key.clone()).or_default() += 1;
        self.received.write().await.push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(self.in_flight.clone());
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.next_reply(&key).await
    }
}
