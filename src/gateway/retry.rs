use std::time::Duration;

use super::{GatewayError, RawDocument, ResourceRequest};

/// Classified result of a single upstream attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(RawDocument),
    Malformed(String),
    NotFound,
    Unauthorized,
    RateLimited,
    ServerError(u16),
    Timeout,
    Network(String),
    OtherStatus(u16),
}

impl AttemptOutcome {
    /// Maps an HTTP status to an outcome. `body` is only parsed for 2xx.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            200..=299 => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(serde_json::Value::Object(document)) => AttemptOutcome::Success(document),
                Ok(other) => AttemptOutcome::Malformed(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )),
                Err(e) => AttemptOutcome::Malformed(e.to_string()),
            },
            401 => AttemptOutcome::Unauthorized,
            404 => AttemptOutcome::NotFound,
            429 => AttemptOutcome::RateLimited,
            500..=599 => AttemptOutcome::ServerError(status),
            _ => AttemptOutcome::OtherStatus(status),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Why the gateway is waiting before the next attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffReason {
    RateLimited,
    ServerError(u16),
    Timeout,
    Network(String),
    UnexpectedStatus(u16),
}

impl BackoffReason {
    fn into_error(self, attempts: u32) -> GatewayError {
        match self {
            BackoffReason::RateLimited => GatewayError::RateLimited { attempts },
            BackoffReason::ServerError(status) => {
                GatewayError::TransientServerError { status, attempts }
            }
            BackoffReason::Timeout => GatewayError::Timeout { attempts },
            BackoffReason::Network(message) => GatewayError::Network { message, attempts },
            BackoffReason::UnexpectedStatus(status) => {
                GatewayError::UnexpectedStatus { status, attempts }
            }
        }
    }
}

/// States of one gateway call. `attempt` is zero-based.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    Attempting {
        attempt: u32,
    },
    BackingOff {
        attempt: u32,
        reason: BackoffReason,
        delay: Duration,
    },
    Terminal(GatewayError),
    Success(RawDocument),
}

impl RetryState {
    pub fn start() -> Self {
        RetryState::Attempting { attempt: 0 }
    }
}

/// Retry budget and backoff curve for upstream calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub rate_limit_cap: Duration,
    pub transient_base: Duration,
    pub transient_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(60),
            rate_limit_cap: Duration::from_secs(300),
            transient_base: Duration::from_secs(1),
            transient_cap: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// `min(base * 2^attempt, cap)` for the given reason
    pub fn backoff_delay(&self, reason: &BackoffReason, attempt: u32) -> Duration {
        let (base, cap) = match reason {
            BackoffReason::RateLimited => (self.rate_limit_base, self.rate_limit_cap),
            _ => (self.transient_base, self.transient_cap),
        };
        let factor = 2u32.saturating_pow(attempt);
        base.saturating_mul(factor).min(cap)
    }

    /// Transition out of `Attempting { attempt }` given what the attempt produced
    pub fn next_state(
        &self,
        request: &ResourceRequest,
        attempt: u32,
        outcome: AttemptOutcome,
    ) -> RetryState {
        let reason = match outcome {
            AttemptOutcome::Success(document) => return RetryState::Success(document),
            AttemptOutcome::Malformed(reason) => {
                return RetryState::Terminal(GatewayError::MalformedResponse {
                    kind: request.kind,
                    reason,
                })
            }
            AttemptOutcome::NotFound => {
                return RetryState::Terminal(GatewayError::NotFound {
                    kind: request.kind,
                    id: request.id.clone(),
                })
            }
            AttemptOutcome::Unauthorized => return RetryState::Terminal(GatewayError::Unauthorized),
            AttemptOutcome::RateLimited => BackoffReason::RateLimited,
            AttemptOutcome::ServerError(status) => BackoffReason::ServerError(status),
            AttemptOutcome::Timeout => BackoffReason::Timeout,
            AttemptOutcome::Network(message) => BackoffReason::Network(message),
            AttemptOutcome::OtherStatus(status) => BackoffReason::UnexpectedStatus(status),
        };

        let attempts_made = attempt + 1;
        if attempts_made >= self.max_attempts {
            return RetryState::Terminal(reason.into_error(attempts_made));
        }

        let delay = self.backoff_delay(&reason, attempt);
        RetryState::BackingOff {
            attempt,
            reason,
            delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ResourceKind;
    use rstest::rstest;

    fn request() -> ResourceRequest {
        ResourceRequest::new(ResourceKind::Profile, "player-1")
    }

    #[rstest]
    #[case(0, 60)]
    #[case(1, 120)]
    #[case(2, 240)]
    #[case(3, 300)]
    #[case(10, 300)]
    fn rate_limit_backoff_doubles_up_to_cap(#[case] attempt: u32, #[case] expected_secs: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff_delay(&BackoffReason::RateLimited, attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(40, 8)]
    fn transient_backoff_doubles_up_to_cap(#[case] attempt: u32, #[case] expected_secs: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff_delay(&BackoffReason::ServerError(503), attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[test]
    fn not_found_and_unauthorized_are_terminal_on_first_attempt() {
        let policy = RetryPolicy::default();

        let state = policy.next_state(&request(), 0, AttemptOutcome::NotFound);
        assert!(matches!(
            state,
            RetryState::Terminal(GatewayError::NotFound { .. })
        ));

        let state = policy.next_state(&request(), 0, AttemptOutcome::Unauthorized);
        assert_eq!(state, RetryState::Terminal(GatewayError::Unauthorized));
    }

    #[test]
    fn rate_limited_backs_off_then_attempts_again() {
        let policy = RetryPolicy::default();

        let state = policy.next_state(&request(), 0, AttemptOutcome::RateLimited);
        assert_eq!(
            state,
            RetryState::BackingOff {
                attempt: 0,
                reason: BackoffReason::RateLimited,
                delay: Duration::from_secs(60),
            }
        );

        let state = policy.next_state(&request(), 1, AttemptOutcome::RateLimited);
        assert!(matches!(
            state,
            RetryState::BackingOff { delay, .. } if delay == Duration::from_secs(120)
        ));
    }

    #[test]
    fn budget_exhaustion_surfaces_classified_error() {
        let policy = RetryPolicy::default();

        let state = policy.next_state(&request(), 2, AttemptOutcome::ServerError(502));
        assert_eq!(
            state,
            RetryState::Terminal(GatewayError::TransientServerError {
                status: 502,
                attempts: 3
            })
        );

        let state = policy.next_state(&request(), 2, AttemptOutcome::Timeout);
        assert_eq!(state, RetryState::Terminal(GatewayError::Timeout { attempts: 3 }));

        let state = policy.next_state(&request(), 2, AttemptOutcome::OtherStatus(418));
        assert_eq!(
            state,
            RetryState::Terminal(GatewayError::UnexpectedStatus {
                status: 418,
                attempts: 3
            })
        );
    }

    #[test]
    fn single_attempt_budget_never_backs_off() {
        let policy = RetryPolicy::default().with_max_attempts(1);
        let state = policy.next_state(&request(), 0, AttemptOutcome::RateLimited);
        assert_eq!(state, RetryState::Terminal(GatewayError::RateLimited { attempts: 1 }));
    }

    #[rstest]
    #[case(200, r#"{"nickname":"s1mple"}"#, true)]
    #[case(204, "", false)]
    #[case(200, "[1,2,3]", false)]
    fn success_statuses_require_a_json_object(
        #[case] status: u16,
        #[case] body: &str,
        #[case] ok: bool,
    ) {
        let outcome = AttemptOutcome::from_status(status, body);
        assert_eq!(matches!(outcome, AttemptOutcome::Success(_)), ok);
        if !ok {
            assert!(matches!(outcome, AttemptOutcome::Malformed(_)));
        }
    }

    #[rstest]
    #[case(401, AttemptOutcome::Unauthorized)]
    #[case(404, AttemptOutcome::NotFound)]
    #[case(429, AttemptOutcome::RateLimited)]
    #[case(500, AttemptOutcome::ServerError(500))]
    #[case(503, AttemptOutcome::ServerError(503))]
    #[case(403, AttemptOutcome::OtherStatus(403))]
    fn classifies_error_statuses(#[case] status: u16, #[case] expected: AttemptOutcome) {
        assert_eq!(AttemptOutcome::from_status(status, "oops"), expected);
    }
}
