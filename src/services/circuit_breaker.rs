//! Circuit breaker implementation for upstream service protection.
//!
//! Per-service gate with states {closed, open, half-open}. `Execute`
//! (here, [`CircuitBreaker::call`]) either calls the wrapped operation or
//! returns `CircuitOpen` without calling it. All state transitions are
//! mutually exclusive; a single write lock guards both the state field and
//! the failure counter so transitions are atomic (SPEC_FULL.md §5(c)). Locks
//! are `std::sync::RwLock`, never held across an `.await` point.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed = 0,
    /// Circuit is open - failing fast
    Open = 1,
    /// Testing if service is back
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Configuration parameters for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u64,
    pub reset_timeout: Duration,
    /// Upstream statuses treated the same as a transport error for breaker
    /// purposes (SPEC_FULL.md §9 — reused from the teacher's `RetryConfig`).
    pub retry_on_status_codes: Vec<u16>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            retry_on_status_codes: vec![408, 504],
        }
    }
}

/// Circuit breaker implementation for protecting upstream services.
///
/// Constructed as `Arc<CircuitBreaker>` via [`CircuitBreaker::new`]. The
/// half-open admission rule departs from the common "N consecutive
/// successes to close" design: a single probe is admitted once
/// `time-since-open-at > reset-timeout / 2`; one success closes the
/// breaker, one failure reopens it and re-arms the timer.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: RwLock<u64>,
    opened_at: RwLock<Option<Instant>>,
    name: String,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: RwLock::new(0),
            opened_at: RwLock::new(None),
            name,
        })
    }

    /// Executes `operation` under the breaker's gate. Returns
    /// `CircuitBreakerError::CircuitOpen` without calling `operation` if the
    /// gate denies admission.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        if !self.should_admit() {
            debug!("circuit breaker {} is open, failing fast", self.name);
            return Err(CircuitBreakerError::CircuitOpen);
        }

        match operation.await {
            Ok(result) => {
                self.on_success();
                Ok(result)
            }
            Err(error) => {
                self.on_failure();
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    fn should_admit(&self) -> bool {
        match self.get_state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = *self.opened_at.read().expect("opened_at poisoned");
                match opened_at {
                    Some(opened_at) if opened_at.elapsed() >= self.config.reset_timeout => {
                        self.transition_to_half_open();
                        self.half_open_admits()
                    }
                    _ => false,
                }
            }
            CircuitState::HalfOpen => self.half_open_admits(),
        }
    }

    fn half_open_admits(&self) -> bool {
        match *self.opened_at.read().expect("opened_at poisoned") {
            Some(opened_at) => opened_at.elapsed() > self.config.reset_timeout / 2,
            None => true,
        }
    }

    fn on_success(&self) {
        match self.get_state() {
            CircuitState::Closed => {
                *self.failure_count.write().expect("failure_count poisoned") = 0;
            }
            CircuitState::HalfOpen => {
                self.transition_to_closed();
            }
            CircuitState::Open => {
                debug!("unexpected success while open for circuit {}", self.name);
            }
        }
    }

    fn on_failure(&self) {
        match self.get_state() {
            CircuitState::Closed => {
                let mut count = self.failure_count.write().expect("failure_count poisoned");
                *count += 1;
                if *count >= self.config.failure_threshold {
                    drop(count);
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to_open();
            }
            CircuitState::Open => {
                // Already open; no additional bookkeeping needed.
            }
        }
    }

    fn transition_to_open(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Relaxed);
        *self.opened_at.write().expect("opened_at poisoned") = Some(Instant::now());
        *self.failure_count.write().expect("failure_count poisoned") = 0;
        warn!("circuit breaker {} opened due to failures", self.name);
    }

    fn transition_to_half_open(&self) {
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Relaxed);
        info!("circuit breaker {} transitioned to half-open", self.name);
    }

    fn transition_to_closed(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::Relaxed);
        *self.failure_count.write().expect("failure_count poisoned") = 0;
        *self.opened_at.write().expect("opened_at poisoned") = None;
        info!("circuit breaker {} closed - service recovered", self.name);
    }

    pub fn get_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn get_failure_count(&self) -> u64 {
        *self.failure_count.read().expect("failure_count poisoned")
    }

    /// Whether `status` should be classified as a breaker failure, reusing
    /// the configured retry-on-status-codes list (SPEC_FULL.md §9).
    pub fn is_retriable_status(&self, status: u16) -> bool {
        self.config.retry_on_status_codes.contains(&status)
    }
}

/// Errors that can occur when using a circuit breaker.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("operation failed: {0}")]
    OperationFailed(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout: Duration::from_millis(20),
            retry_on_status_codes: vec![408, 504],
        }
    }

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new("svc".into(), fast_config());
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn open_rejects_without_calling_operation() {
        let breaker = CircuitBreaker::new("svc".into(), fast_config());
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;

        let mut called = false;
        let result = breaker
            .call(async {
                called = true;
                Ok::<_, &str>(())
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
        assert!(!called);
    }

    #[tokio::test]
    async fn half_open_single_success_closes() {
        let breaker = CircuitBreaker::new("svc".into(), fast_config());
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(25)).await;

        let result = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_single_failure_reopens() {
        let breaker = CircuitBreaker::new("svc".into(), fast_config());
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(25)).await;

        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn success_in_closed_resets_counter() {
        let breaker = CircuitBreaker::new("svc".into(), fast_config());
        let _ = breaker.call(async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.get_failure_count(), 1);
        let _ = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert_eq!(breaker.get_failure_count(), 0);
    }
}
