//! Upstream instance and service membership.
//!
//! An [`Instance`] is a single running upstream process; a [`Service`] is a
//! named, mutable collection of instances selected by a load-balancing
//! strategy. Health fields on an `Instance` are read under a read lock and
//! written under the instance's own write lock, never held across an
//! `.await` point, per the concurrency model shared with the circuit
//! breaker and load balancer.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Health classification of an [`Instance`], transitioned only by the
/// health tracker's hysteresis rule (I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

impl Default for Health {
    fn default() -> Self {
        Health::Unknown
    }
}

/// Mutable health-tracking state for an instance, grouped so a single write
/// lock makes every transition atomic.
#[derive(Debug, Default)]
pub struct HealthState {
    pub health: Health,
    pub last_probe_at: Option<Instant>,
    pub response_time_ms: Option<u64>,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

/// A single running upstream process identified by a base URL.
///
/// `weight` participates in weighted-random selection; `active_connections`
/// is bumped by the dispatcher around each forward call and read by
/// least-connections-flavoured balancing.
#[derive(Debug)]
pub struct Instance {
    pub id: String,
    pub base_url: String,
    pub weight: u32,
    pub health_check_path: String,
    state: RwLock<HealthState>,
    active_connections: AtomicU32,
    total_requests: AtomicU64,
}

impl Instance {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            weight,
            health_check_path: "/health".to_string(),
            state: RwLock::new(HealthState::default()),
            active_connections: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
        }
    }

    pub fn with_health_check_path(mut self, path: impl Into<String>) -> Self {
        self.health_check_path = path.into();
        self
    }

    pub fn health(&self) -> Health {
        self.state.read().expect("instance state poisoned").health
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.health(), Health::Healthy | Health::Degraded)
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn begin_request(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_request(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Records one probe outcome, applying the hysteresis rule (I2):
    /// `success_threshold` consecutive successes promote to healthy,
    /// `failure_threshold` consecutive failures demote to unhealthy. A
    /// single failure while healthy demotes to degraded, not unhealthy.
    pub fn record_probe(
        &self,
        success: bool,
        response_time_ms: Option<u64>,
        success_threshold: u32,
        failure_threshold: u32,
    ) {
        let mut state = self.state.write().expect("instance state poisoned");
        state.last_probe_at = Some(Instant::now());
        state.response_time_ms = response_time_ms;

        if success {
            state.consecutive_failures = 0;
            state.consecutive_successes = state.consecutive_successes.saturating_add(1);
            if state.consecutive_successes >= success_threshold {
                state.health = Health::Healthy;
            }
        } else {
            state.consecutive_successes = 0;
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            if state.consecutive_failures >= failure_threshold {
                state.health = Health::Unhealthy;
            } else if state.health == Health::Healthy {
                state.health = Health::Degraded;
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.read().expect("instance state poisoned").consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.state.read().expect("instance state poisoned").consecutive_successes
    }
}
