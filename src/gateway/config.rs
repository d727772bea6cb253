use std::time::Duration;
use thiserror::Error;

use super::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://open.faceit.com/data/v4";
const DEFAULT_GAME_ID: &str = "cs2";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

/// Settings for outbound upstream calls
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    api_key: String,
    /// Game whose statistics are requested
    pub game_id: String,
    /// Global cap on simultaneous upstream calls
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    /// Fixed pause before every dispatch
    pub politeness_delay: Duration,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("game_id", &self.game_id)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("politeness_delay", &self.politeness_delay)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            game_id: DEFAULT_GAME_ID.to_string(),
            max_concurrency: 4,
            request_timeout: Duration::from_secs(10),
            politeness_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }

    /// Reads `STATS_*` environment variables, defaulting everything but the key
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("STATS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("STATS_API_KEY"))?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = std::env::var("STATS_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(game_id) = std::env::var("STATS_GAME_ID") {
            if !game_id.trim().is_empty() {
                config.game_id = game_id;
            }
        }
        if let Some(limit) = env_parse::<usize>("STATS_MAX_CONCURRENCY") {
            config.max_concurrency = limit.max(1);
        }
        if let Some(secs) = env_parse::<u64>("STATS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(millis) = env_parse::<u64>("STATS_POLITENESS_DELAY_MS") {
            config.politeness_delay = Duration::from_millis(millis);
        }
        if let Some(attempts) = env_parse::<u32>("STATS_MAX_ATTEMPTS") {
            config.retry = config.retry.with_max_attempts(attempts);
        }

        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
