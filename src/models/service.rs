//! Named, mutable collections of upstream [`Instance`]s.

use std::sync::{Arc, RwLock};

use super::instance::Instance;

/// A named collection of interchangeable instances. The instance list
/// supports many concurrent readers (route dispatch, health probes) and an
/// exclusive writer on add/remove, matching the concurrency model in
/// SPEC_FULL.md §5(b).
#[derive(Debug)]
pub struct Service {
    pub name: String,
    instances: RwLock<Vec<Arc<Instance>>>,
}

impl Service {
    pub fn new(name: impl Into<String>, instances: Vec<Arc<Instance>>) -> Self {
        Self {
            name: name.into(),
            instances: RwLock::new(instances),
        }
    }

    pub fn instances(&self) -> Vec<Arc<Instance>> {
        self.instances
            .read()
            .expect("service instance list poisoned")
            .clone()
    }

    pub fn set_instances(&self, instances: Vec<Arc<Instance>>) {
        *self.instances.write().expect("service instance list poisoned") = instances;
    }

    pub fn healthy_instances(&self) -> Vec<Arc<Instance>> {
        self.instances()
            .into_iter()
            .filter(|i| i.is_healthy())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<Arc<Instance>> {
        self.instances().into_iter().find(|i| i.id == id)
    }
}
