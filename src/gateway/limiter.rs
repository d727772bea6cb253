use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::GatewayError;

/// Fixed-size limiter shared by every gateway call in the process
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, GatewayError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::Closed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wakes all waiters with `Closed` and rejects future acquisitions
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_return_on_drop() {
        let limiter = ConcurrencyLimiter::new(2);

        let first = limiter.acquire().await.unwrap();
        let _second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(first);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn closed_limiter_rejects_acquire() {
        let limiter = ConcurrencyLimiter::new(1);
        limiter.close();

        let result = limiter.acquire().await;
        assert!(matches!(result, Err(GatewayError::Closed)));
        assert!(limiter.is_closed());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
    }
}
