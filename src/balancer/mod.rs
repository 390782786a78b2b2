//! Load balancing: selects one live instance for a service.
//!
//! `LoadBalancer` stays a `trait Send + Sync` object behind `Arc<dyn
//! LoadBalancer>`, selected by a factory keyed on configured strategy —
//! directly the teacher's `services/load_balancer.rs` shape. Weighted
//! selection draws a single random value in `[0, W)` rather than the
//! teacher's expanded round-robin list; health-first and sticky-session are
//! new variants grounded in the same trait.

pub mod health_tracker;
pub mod sticky;
pub mod strategies;

use std::sync::Arc;

use crate::context::RequestContext;
use crate::models::gateway_config::LoadBalancerConfig;
use crate::models::instance::Instance;

pub use health_tracker::HealthTracker;
pub use sticky::StickySessionBalancer;
pub use strategies::{HealthFirstBalancer, RoundRobinBalancer, WeightedRandomBalancer};

/// A pluggable strategy for picking one instance from a service's instance
/// list for a given request. Implementations must not hold a lock across
/// an `.await` point.
pub trait LoadBalancer: Send + Sync {
    fn select(
        &self,
        service_name: &str,
        instances: &[Arc<Instance>],
        ctx: &RequestContext,
    ) -> Option<Arc<Instance>>;
}

/// Builds a `LoadBalancer` trait object for a configured strategy name,
/// wiring health-first and sticky-session variants to their fallback
/// strategy (round-robin by default).
pub struct LoadBalancerFactory;

impl LoadBalancerFactory {
    pub fn create(strategy: &str, config: &LoadBalancerConfig) -> Arc<dyn LoadBalancer> {
        match strategy {
            "weighted-random" => Arc::new(WeightedRandomBalancer::default()),
            "health-first" => Arc::new(HealthFirstBalancer::new(Arc::new(
                RoundRobinBalancer::default(),
            ))),
            "sticky-session" => Arc::new(StickySessionBalancer::new(
                Arc::new(RoundRobinBalancer::default()),
                config.sticky_session.clone(),
            )),
            _ => Arc::new(RoundRobinBalancer::default()),
        }
    }
}
