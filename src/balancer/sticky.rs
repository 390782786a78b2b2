//! Sticky-session load balancing: binds a client-identifying token to one
//! chosen instance for a configured duration.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::context::RequestContext;
use crate::models::gateway_config::StickySessionConfig;
use crate::models::instance::Instance;

use super::LoadBalancer;

struct StickySession {
    instance_id: String,
    last_access: Instant,
}

/// Extracts a session id from a configured cookie name, else a configured
/// header name. A live, still-present, still-live binding is returned
/// as-is and its last-access refreshed; otherwise the fallback strategy
/// picks, the binding is recorded, and it expires after `duration`.
pub struct StickySessionBalancer {
    fallback: Arc<dyn LoadBalancer>,
    config: StickySessionConfig,
    bindings: RwLock<HashMap<String, StickySession>>,
}

impl StickySessionBalancer {
    pub fn new(fallback: Arc<dyn LoadBalancer>, config: StickySessionConfig) -> Self {
        Self {
            fallback,
            config,
            bindings: RwLock::new(HashMap::new()),
        }
    }

    fn session_id(&self, ctx: &RequestContext) -> Option<String> {
        ctx.cookie(&self.config.cookie_name)
            .or_else(|| ctx.header(&self.config.header_name).map(|s| s.to_string()))
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(self.config.duration_secs)
    }
}

impl LoadBalancer for StickySessionBalancer {
    fn select(
        &self,
        service_name: &str,
        instances: &[Arc<Instance>],
        ctx: &RequestContext,
    ) -> Option<Arc<Instance>> {
        let Some(session_id) = self.session_id(ctx) else {
            return self.fallback.select(service_name, instances, ctx);
        };

        {
            let mut bindings = self.bindings.write().expect("sticky bindings poisoned");
            if let Some(binding) = bindings.get_mut(&session_id) {
                let expired = binding.last_access.elapsed() > self.duration();
                let still_live = instances
                    .iter()
                    .find(|i| i.id == binding.instance_id)
                    .filter(|i| i.is_healthy() || i.health() == crate::models::instance::Health::Unknown);
                if !expired {
                    if let Some(instance) = still_live {
                        binding.last_access = Instant::now();
                        return Some(instance.clone());
                    }
                }
            }
        }

        let picked = self.fallback.select(service_name, instances, ctx)?;
        self.bindings.write().expect("sticky bindings poisoned").insert(
            session_id,
            StickySession {
                instance_id: picked.id.clone(),
                last_access: Instant::now(),
            },
        );
        Some(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::strategies::RoundRobinBalancer;
    use std::time::Instant as StdInstant;

    fn config() -> StickySessionConfig {
        StickySessionConfig {
            cookie_name: "sid".to_string(),
            header_name: "x-session-id".to_string(),
            duration_secs: 3600,
        }
    }

    fn instances() -> Vec<Arc<Instance>> {
        vec![
            Arc::new(Instance::new("i0", "http://a", 1)),
            Arc::new(Instance::new("i1", "http://b", 1)),
        ]
    }

    #[test]
    fn same_cookie_returns_same_instance() {
        let lb = StickySessionBalancer::new(Arc::new(RoundRobinBalancer::default()), config());
        let insts = instances();
        let ctx = RequestContext::new("GET", "/x", StdInstant::now()).with_header("Cookie", "sid=abc");
        let first = lb.select("svc", &insts, &ctx).unwrap().id.clone();
        let second = lb.select("svc", &insts, &ctx).unwrap().id.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn no_cookie_or_header_falls_back() {
        let lb = StickySessionBalancer::new(Arc::new(RoundRobinBalancer::default()), config());
        let insts = instances();
        let ctx = RequestContext::new("GET", "/x", StdInstant::now());
        assert!(lb.select("svc", &insts, &ctx).is_some());
    }

    #[test]
    fn rebinds_when_bound_instance_disappears() {
        let lb = StickySessionBalancer::new(Arc::new(RoundRobinBalancer::default()), config());
        let ctx = RequestContext::new("GET", "/x", StdInstant::now()).with_header("Cookie", "sid=abc");
        let first_set = vec![Arc::new(Instance::new("gone", "http://gone", 1))];
        let bound = lb.select("svc", &first_set, &ctx).unwrap();
        assert_eq!(bound.id, "gone");

        let second_set = instances();
        let rebound = lb.select("svc", &second_set, &ctx).unwrap();
        assert_ne!(rebound.id, "gone");
    }
}
