//! Shared fixtures for the dispatcher-level integration tests.

use std::collections::HashMap;

use gateway_rs::models::gateway_config::{
    FallbackPolicy, GatewayConfig, InstanceConfig, RoutingConfig, ServiceConfig,
};
use gateway_rs::models::route::{Operator, Predicate, PredicateType, RoutingRule};

/// A `GatewayConfig` with one service named `service_name` backed by
/// `instances` (id, base_url, weight) and a single catch-all routing rule
/// forwarding every path to it.
pub fn single_service_config(
    service_name: &str,
    instances: &[(&str, &str, u32)],
) -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.services.push(ServiceConfig {
        name: service_name.to_string(),
        instances: instances
            .iter()
            .map(|(id, base_url, weight)| InstanceConfig {
                id: id.to_string(),
                base_url: base_url.to_string(),
                weight: *weight,
                health_check_path: "/health".to_string(),
            })
            .collect(),
    });
    cfg.routing = RoutingConfig {
        rules: vec![catch_all_rule(service_name)],
        fallback: FallbackPolicy::default(),
    };
    cfg
}

pub fn catch_all_rule(service: &str) -> RoutingRule {
    RoutingRule {
        priority: 0,
        predicates: vec![Predicate {
            predicate_type: PredicateType::Path,
            field: None,
            operator: Operator::StartsWith,
            value: "/".to_string(),
            value2: None,
            negate: false,
            case_sensitive: true,
        }],
        actions: vec![],
        service: service.to_string(),
        timeout_ms: None,
        retries: None,
        script: None,
    }
}

pub fn header_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
