//! Background health probing.
//!
//! One `tokio::spawn`ed loop per instance issues a GET to
//! `<instance>/<health-path>` on a configurable interval, using the pooled
//! `reqwest::Client`, and records the outcome on the `Instance` under its
//! own lock (SPEC_FULL.md §5(b)). A response in `[200,300)` counts as
//! success; anything else, including a transport error or timeout, counts
//! as failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::models::gateway_config::HealthCheckConfig;
use crate::models::instance::Instance;

pub struct HealthTracker {
    client: reqwest::Client,
}

impl HealthTracker {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Spawns one probe loop per instance currently in `instances`. Callers
    /// reconfiguring the instance set are responsible for starting loops
    /// for newly added instances; loops for removed instances simply keep
    /// probing a URL nobody routes to until the process exits, matching the
    /// "no persistent state across restarts" non-goal — they carry no
    /// state worth reconciling.
    pub fn spawn_for_instances(&self, service_name: &str, instances: Vec<Arc<Instance>>, config: HealthCheckConfig) {
        for instance in instances {
            let client = self.client.clone();
            let config = config.clone();
            let service_name = service_name.to_string();
            tokio::spawn(async move {
                Self::probe_loop(client, instance, service_name, config).await;
            });
        }
    }

    async fn probe_loop(
        client: reqwest::Client,
        instance: Arc<Instance>,
        service_name: String,
        config: HealthCheckConfig,
    ) {
        loop {
            let url = format!("{}{}", instance.base_url, instance.health_check_path);
            let start = Instant::now();
            let deadline = Duration::from_millis(config.timeout_ms);
            let outcome = tokio::time::timeout(deadline, client.get(&url).send()).await;

            let (success, response_time_ms) = match outcome {
                Ok(Ok(resp)) => {
                    let status = resp.status().as_u16();
                    (
                        (200..300).contains(&status),
                        Some(start.elapsed().as_millis() as u64),
                    )
                }
                Ok(Err(e)) => {
                    debug!("health probe for {service_name}/{} failed: {e}", instance.id);
                    (false, None)
                }
                Err(_) => {
                    debug!("health probe for {service_name}/{} timed out", instance.id);
                    (false, None)
                }
            };

            let was_healthy = instance.is_healthy();
            instance.record_probe(
                success,
                response_time_ms,
                config.success_threshold,
                config.failure_threshold,
            );
            if was_healthy != instance.is_healthy() {
                warn!(
                    "instance {}/{} health transitioned to {:?}",
                    service_name,
                    instance.id,
                    instance.health()
                );
            }

            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }
    }
}
