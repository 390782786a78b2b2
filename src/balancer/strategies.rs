//! Round-robin, weighted-random and health-first load-balancing strategies.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::Rng;

use crate::context::RequestContext;
use crate::models::instance::Instance;

use super::LoadBalancer;

/// Maintains a per-service monotonically advancing index modulo instance
/// count, guarded against the instance set changing between picks by
/// re-reading `instances.len()` on every call.
#[derive(Default)]
pub struct RoundRobinBalancer {
    counters: RwLock<HashMap<String, usize>>,
}

impl LoadBalancer for RoundRobinBalancer {
    fn select(
        &self,
        service_name: &str,
        instances: &[Arc<Instance>],
        _ctx: &RequestContext,
    ) -> Option<Arc<Instance>> {
        if instances.is_empty() {
            return None;
        }
        let mut counters = self.counters.write().expect("round-robin counters poisoned");
        let counter = counters.entry(service_name.to_string()).or_insert(0);
        let index = *counter % instances.len();
        *counter = counter.wrapping_add(1);
        Some(instances[index].clone())
    }
}

/// Sums weights W, draws r in [0, W), and selects the first instance whose
/// running cumulative weight exceeds r. All-zero weights fall back to the
/// first instance deterministically, per the redesigned semantics (the
/// teacher instead expands weights into a repeated round-robin list).
#[derive(Default)]
pub struct WeightedRandomBalancer;

impl LoadBalancer for WeightedRandomBalancer {
    fn select(
        &self,
        _service_name: &str,
        instances: &[Arc<Instance>],
        _ctx: &RequestContext,
    ) -> Option<Arc<Instance>> {
        if instances.is_empty() {
            return None;
        }
        let total_weight: u32 = instances.iter().map(|i| i.weight).sum();
        if total_weight == 0 {
            return Some(instances[0].clone());
        }
        let draw = rand::thread_rng().gen_range(0..total_weight);
        let mut running = 0u32;
        for instance in instances {
            running += instance.weight;
            if draw < running {
                return Some(instance.clone());
            }
        }
        Some(instances[instances.len() - 1].clone())
    }
}

/// Filters to healthy instances, then delegates to a fallback strategy; if
/// none are healthy, delegates to the fallback strategy over the full
/// (degraded) set rather than failing closed.
pub struct HealthFirstBalancer {
    fallback: Arc<dyn LoadBalancer>,
}

impl HealthFirstBalancer {
    pub fn new(fallback: Arc<dyn LoadBalancer>) -> Self {
        Self { fallback }
    }
}

impl LoadBalancer for HealthFirstBalancer {
    fn select(
        &self,
        service_name: &str,
        instances: &[Arc<Instance>],
        ctx: &RequestContext,
    ) -> Option<Arc<Instance>> {
        let healthy: Vec<Arc<Instance>> = instances
            .iter()
            .filter(|i| i.is_healthy())
            .cloned()
            .collect();
        if !healthy.is_empty() {
            self.fallback.select(service_name, &healthy, ctx)
        } else {
            self.fallback.select(service_name, instances, ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn ctx() -> RequestContext {
        RequestContext::new("GET", "/x", Instant::now())
    }

    fn instances(weights: &[u32]) -> Vec<Arc<Instance>> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Arc::new(Instance::new(format!("i{i}"), format!("http://h{i}"), *w)))
            .collect()
    }

    #[test]
    fn round_robin_cycles_through_instances() {
        let lb = RoundRobinBalancer::default();
        let insts = instances(&[1, 1, 1]);
        let picks: Vec<_> = (0..3)
            .map(|_| lb.select("svc", &insts, &ctx()).unwrap().id.clone())
            .collect();
        assert_eq!(picks, vec!["i0", "i1", "i2"]);
        assert_eq!(lb.select("svc", &insts, &ctx()).unwrap().id, "i0");
    }

    #[test]
    fn weighted_random_all_zero_returns_first() {
        let lb = WeightedRandomBalancer;
        let insts = instances(&[0, 0, 0]);
        assert_eq!(lb.select("svc", &insts, &ctx()).unwrap().id, "i0");
    }

    #[test]
    fn weighted_random_distribution_within_tolerance() {
        let lb = WeightedRandomBalancer;
        let insts = instances(&[3, 2, 1]);
        let mut counts = [0u32; 3];
        for _ in 0..6000 {
            let picked = lb.select("svc", &insts, &ctx()).unwrap();
            let idx: usize = picked.id.trim_start_matches('i').parse().unwrap();
            counts[idx] += 1;
        }
        assert!((2850..3150).contains(&counts[0]));
        assert!((1850..2150).contains(&counts[1]));
        assert!((850..1150).contains(&counts[2]));
    }

    #[test]
    fn health_first_falls_back_to_degraded_set_when_none_healthy() {
        let lb = HealthFirstBalancer::new(Arc::new(RoundRobinBalancer::default()));
        let insts = instances(&[1, 1]);
        // none have been probed, so health == Unknown (not healthy)
        let picked = lb.select("svc", &insts, &ctx());
        assert!(picked.is_some());
    }
}
