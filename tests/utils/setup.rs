use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use statsgate::{
    gateway::{Gateway, GatewayConfig},
    AppState, StatsService,
};

use super::mocks::MockTransport;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub transport: MockTransport,
    pub gateway: Arc<Gateway>,
    pub service: Arc<StatsService>,
}

impl TestSetup {
    /// Full HTTP router over this setup's service
    pub fn app(&self) -> Router {
        statsgate::app(AppState::new(self.service.clone()))
    }
}

pub struct TestSetupBuilder {
    transport: MockTransport,
    config: GatewayConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            transport: MockTransport::new(),
            config: GatewayConfig::new("test-key").with_politeness_delay(Duration::ZERO),
        }
    }

    pub fn with_transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config = self.config.with_max_concurrency(max_concurrency);
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.with_politeness_delay(delay);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(timeout);
        self
    }

    pub fn build(self) -> TestSetup {
        let gateway = Arc::new(
            Gateway::builder(Arc::new(self.transport.clone()), &self.config).build(),
        );
        let service = Arc::new(
            StatsService::builder(gateway.clone())
                .with_game_id(self.config.game_id.clone())
                .build(),
        );

        TestSetup {
            transport: self.transport,
            gateway,
            service,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
