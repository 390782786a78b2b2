//! The gateway's configuration document: listener, services, routing,
//! auth/rate-limit surfaces, load-balancer, cache, transformation and
//! circuit-breaker sections, plus monitoring. Deserialized with `serde`
//! from the JSON document resolved by [`crate::config::settings::load_settings`]
//! and checked by [`crate::config::validation::ConfigValidator`] — directly
//! carried over from the teacher's `models::settings::Settings`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::instance::Instance;
use super::route::RoutingRule;
use super::transform_rule::TransformRule;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5900
}
fn default_read_timeout_ms() -> u64 {
    30_000
}
fn default_write_timeout_ms() -> u64 {
    30_000
}
fn default_idle_timeout_ms() -> u64 {
    60_000
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_connections: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub id: String,
    pub base_url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_health_path")]
    pub health_check_path: String,
}

fn default_weight() -> u32 {
    1
}
fn default_health_path() -> String {
    "/health".to_string()
}

/// A named upstream. Its load-balancing strategy is not configured here —
/// see [`LoadBalancerConfig::per_service_strategies`], keyed by this name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub instances: Vec<InstanceConfig>,
}

impl ServiceConfig {
    pub fn to_instances(&self) -> Vec<Arc<Instance>> {
        self.instances
            .iter()
            .map(|i| {
                Arc::new(
                    Instance::new(i.id.clone(), i.base_url.clone(), i.weight)
                        .with_health_check_path(i.health_check_path.clone()),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default = "default_fallback_status")]
    pub status_code: u16,
}

fn default_fallback_status() -> u16 {
    502
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

/// Surface only: skip-paths and provider identifiers. Token verification is
/// an external collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub skip_paths: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Surface only: the shape rate-limit configuration takes. Token-bucket
/// mechanics are an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(default)]
    pub per_user: bool,
    #[serde(default)]
    pub per_service: bool,
}

fn default_rps() -> u32 {
    100
}
fn default_burst() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_probe_interval_ms() -> u64 {
    10_000
}
fn default_probe_timeout_ms() -> u64 {
    2_000
}
fn default_success_threshold() -> u32 {
    2
}
fn default_failure_threshold() -> u32 {
    3
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_probe_interval_ms(),
            timeout_ms: default_probe_timeout_ms(),
            success_threshold: default_success_threshold(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickySessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    #[serde(default = "default_sticky_duration_secs")]
    pub duration_secs: u64,
}

fn default_cookie_name() -> String {
    "gw_sid".to_string()
}
fn default_header_name() -> String {
    "X-Session-Id".to_string()
}
fn default_sticky_duration_secs() -> u64 {
    1800
}

impl Default for StickySessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            header_name: default_header_name(),
            duration_secs: default_sticky_duration_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_idle_per_host")]
    pub idle_conns_per_host: usize,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub disable_compression: bool,
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}
fn default_idle_per_host() -> usize {
    32
}
fn default_keep_alive_secs() -> u64 {
    90
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            dial_timeout_ms: default_dial_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            idle_conns_per_host: default_idle_per_host(),
            keep_alive_secs: default_keep_alive_secs(),
            disable_compression: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    #[serde(default)]
    pub per_service_strategies: HashMap<String, String>,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub sticky_session: StickySessionConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_strategy() -> String {
    "round-robin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default)]
    pub warm_urls: Vec<String>,
    #[serde(default)]
    pub warm_interval_secs: Option<u64>,
}

fn default_cache_ttl_secs() -> u64 {
    60
}
fn default_max_entries() -> usize {
    10_000
}
fn default_max_bytes() -> usize {
    64 * 1024 * 1024
}
fn default_cleanup_interval_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_ttl_secs: default_cache_ttl_secs(),
            max_entries: default_max_entries(),
            max_bytes: default_max_bytes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            warm_urls: Vec::new(),
            warm_interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(default)]
    pub rules: Vec<TransformRule>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
    #[serde(default = "default_retry_on_status_codes")]
    pub retry_on_status_codes: Vec<u16>,
}

fn default_reset_timeout_secs() -> u64 {
    60
}
fn default_retry_on_status_codes() -> Vec<u16> {
    vec![408, 504]
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_secs: default_reset_timeout_secs(),
            retry_on_status_codes: default_retry_on_status_codes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default)]
    pub default: CircuitBreakerSettings,
    #[serde(default)]
    pub per_service: HashMap<String, CircuitBreakerSettings>,
}

impl CircuitBreakerConfig {
    pub fn for_service(&self, service: &str) -> CircuitBreakerSettings {
        self.per_service
            .get(service)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_path: default_metrics_path(),
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// A single deprecated API version and the response headers it triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDeprecation {
    pub version: String,
    /// `X-API-Deprecation` body; defaults to a generic message if absent.
    #[serde(default)]
    pub message: Option<String>,
    /// `Sunset` header value (RFC 8594), e.g. an HTTP-date.
    #[serde(default)]
    pub sunset: Option<String>,
}

/// API-version deprecation policy: requests naming a deprecated version in
/// `version_header` get `X-API-Deprecation`/`Sunset` on the response
/// (SPEC_FULL.md §8 scenario 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeprecationConfig {
    #[serde(default = "default_version_header")]
    pub version_header: String,
    #[serde(default)]
    pub versions: Vec<VersionDeprecation>,
}

fn default_version_header() -> String {
    "X-API-Version".to_string()
}

impl Default for DeprecationConfig {
    fn default() -> Self {
        Self {
            version_header: default_version_header(),
            versions: Vec::new(),
        }
    }
}

/// Top-level gateway configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub load_balancer: LoadBalancerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub transformation: TransformationConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub deprecation: DeprecationConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            listener: ListenerConfig::default(),
            services: Vec::new(),
            routing: RoutingConfig::default(),
            auth: None,
            rate_limit: None,
            load_balancer: LoadBalancerConfig::default(),
            cache: CacheConfig::default(),
            transformation: TransformationConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            monitoring: MonitoringConfig::default(),
            deprecation: DeprecationConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Structural, non-exhaustive self-check used before the full
    /// [`crate::config::validation::ConfigValidator`] pass. Mirrors the
    /// teacher's `Settings::validate`.
    pub fn validate(&self) -> Result<(), String> {
        if self.services.is_empty() {
            return Err("configuration defines no services".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err("service name must not be empty".to_string());
            }
            if !seen.insert(service.name.clone()) {
                return Err(format!("duplicate service name '{}'", service.name));
            }
            if service.instances.is_empty() {
                return Err(format!("service '{}' has no instances", service.name));
            }
        }
        for rule in &self.routing.rules {
            rule.validate()?;
            if !seen.contains(&rule.service) {
                return Err(format!(
                    "routing rule references unknown service '{}'",
                    rule.service
                ));
            }
        }
        Ok(())
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_services_fails_validation() {
        let cfg = GatewayConfig::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_service_names_rejected() {
        let mut cfg = GatewayConfig::default();
        let svc = ServiceConfig {
            name: "svc-a".to_string(),
            instances: vec![InstanceConfig {
                id: "i1".to_string(),
                base_url: "http://a".to_string(),
                weight: 1,
                health_check_path: "/health".to_string(),
            }],
        };
        cfg.services.push(svc.clone());
        cfg.services.push(svc);
        assert!(cfg.validate().is_err());
    }
}
