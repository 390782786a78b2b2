//! Request dispatcher: composes routing, transformation, caching, circuit
//! breaking, load balancing and pooled forwarding into one per-request call
//! (SPEC_FULL.md §2, §4.7). Replaces the teacher's `RouteHandler`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::web::Bytes;
use log::warn;
use reqwest::Method;

use crate::balancer::{LoadBalancer, LoadBalancerFactory};
use crate::cache::{fingerprint, is_cacheable_method, is_cacheable_response, resolve_ttl, CachedResponse, ResponseCache};
use crate::context::RequestContext;
use crate::models::error::GatewayError;
use crate::models::gateway_config::{DeprecationConfig, GatewayConfig};
use crate::models::instance::Instance;
use crate::models::service::Service;
use crate::pool::ConnectionPool;
use crate::routing::RoutingEngine;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use crate::transform::{ResponseParts, TransformationPipeline};
use crate::utils::path::build_target_url;

fn to_breaker_config(settings: &crate::models::gateway_config::CircuitBreakerSettings) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: settings.failure_threshold as u64,
        reset_timeout: Duration::from_secs(settings.reset_timeout_secs),
        retry_on_status_codes: settings.retry_on_status_codes.clone(),
    }
}

/// Wires every per-request component together for one gateway deployment.
/// Constructed once at startup from a [`GatewayConfig`]; every field is
/// immutable after construction except the interior-mutable state each
/// component owns itself.
pub struct Dispatcher {
    routing: RoutingEngine,
    transform: TransformationPipeline,
    services: HashMap<String, Arc<Service>>,
    breakers: HashMap<String, Arc<CircuitBreaker>>,
    balancers: HashMap<String, Arc<dyn LoadBalancer>>,
    pool: Arc<ConnectionPool>,
    cache: Option<Arc<ResponseCache>>,
    deprecation: DeprecationConfig,
}

impl Dispatcher {
    pub fn new(config: &GatewayConfig) -> Result<Arc<Self>, GatewayError> {
        let routing = RoutingEngine::new(&config.routing.rules, config.routing.fallback.clone())?;
        let transform = TransformationPipeline::new(config.transformation.rules.clone())?;

        let mut services = HashMap::new();
        let mut breakers = HashMap::new();
        let mut balancers = HashMap::new();
        for service_config in &config.services {
            let name = service_config.name.clone();
            services.insert(
                name.clone(),
                Arc::new(Service::new(name.clone(), service_config.to_instances())),
            );
            breakers.insert(
                name.clone(),
                CircuitBreaker::new(name.clone(), to_breaker_config(&config.circuit_breaker.for_service(&name))),
            );
            let strategy = config
                .load_balancer
                .per_service_strategies
                .get(&name)
                .cloned()
                .unwrap_or_else(|| config.load_balancer.default_strategy.clone());
            balancers.insert(name, LoadBalancerFactory::create(&strategy, &config.load_balancer));
        }

        let pool = Arc::new(ConnectionPool::new(config.load_balancer.pool.clone()));
        let cache = config.cache.enabled.then(|| Arc::new(ResponseCache::new(&config.cache)));

        Ok(Arc::new(Self {
            routing,
            transform,
            services,
            breakers,
            balancers,
            pool,
            cache,
            deprecation: config.deprecation.clone(),
        }))
    }

    /// Spawns the per-instance health probe loops for every configured
    /// service (SPEC_FULL.md §4.2).
    pub fn spawn_health_trackers(self: &Arc<Self>, config: &GatewayConfig) {
        let tracker = crate::balancer::HealthTracker::new(reqwest::Client::new());
        for (name, service) in &self.services {
            tracker.spawn_for_instances(name, service.instances(), config.load_balancer.health_check.clone());
        }
    }

    /// Spawns the periodic cache TTL sweep, if caching is enabled.
    pub fn spawn_cache_sweep(self: &Arc<Self>, config: &GatewayConfig) {
        if let Some(cache) = self.cache.clone() {
            let interval = Duration::from_secs(config.cache.cleanup_interval_secs);
            tokio::spawn(crate::cache::run_sweep_loop(cache, interval));
        }
    }

    pub async fn dispatch(&self, mut ctx: RequestContext) -> Result<ResponseParts, GatewayError> {
        let started_at = Instant::now();
        let decision = self.routing.evaluate(&ctx)?;

        if let Some((status_code, location)) = &decision.redirect {
            let mut headers = HashMap::new();
            headers.insert("location".to_string(), location.clone());
            return Ok(ResponseParts {
                status: *status_code,
                headers,
                body: Bytes::new(),
            });
        }

        Self::apply_routing_decision(&mut ctx, &decision);
        self.transform.apply_request(&mut ctx)?;

        let cacheable_request = self.cache.is_some() && is_cacheable_method(&ctx.method);
        let cache_key = cacheable_request.then(|| fingerprint(&ctx, &decision.service));

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            if let Some(cached) = cache.get(key) {
                let mut headers: HashMap<String, String> = cached.headers.into_iter().collect();
                self.inject_gateway_headers(&ctx, &decision.service, started_at, "HIT", &mut headers);
                return Ok(ResponseParts {
                    status: cached.status,
                    headers,
                    body: Bytes::from(cached.body),
                });
            }
        }

        let service = self
            .services
            .get(&decision.service)
            .ok_or_else(|| GatewayError::NoHealthyInstance {
                service: decision.service.clone(),
            })?;
        let breaker = self.breakers.get(&decision.service).cloned().ok_or_else(|| {
            GatewayError::Internal(format!("no circuit breaker configured for '{}'", decision.service))
        })?;
        let balancer = self.balancers.get(&decision.service).cloned().ok_or_else(|| {
            GatewayError::Internal(format!("no load balancer configured for '{}'", decision.service))
        })?;
        let method = Method::from_bytes(ctx.method.as_bytes()).unwrap_or(Method::GET);

        let mut last_err: Option<GatewayError> = None;
        let mut response_parts: Option<ResponseParts> = None;
        for attempt in 0..=decision.retries {
            ctx.attempt = attempt;
            let candidates = service.instances();
            let Some(instance) = balancer.select(&decision.service, &candidates, &ctx) else {
                last_err = Some(GatewayError::NoHealthyInstance {
                    service: decision.service.clone(),
                });
                break;
            };

            match self
                .execute_once(&decision.service, &instance, method.clone(), &ctx, &breaker, decision.timeout)
                .await
            {
                Ok(parts) => {
                    response_parts = Some(parts);
                    break;
                }
                Err(e) => {
                    warn!(
                        "attempt {attempt} of {} for service '{}' failed: {e}",
                        decision.retries, decision.service
                    );
                    last_err = Some(e);
                    if attempt == decision.retries {
                        break;
                    }
                }
            }
        }

        let mut response = match response_parts {
            Some(parts) => parts,
            None => return Err(last_err.unwrap_or_else(|| GatewayError::Internal("dispatch produced no response".into()))),
        };

        self.transform.apply_response(&ctx, &mut response)?;

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            let cache_control = response.headers.get("cache-control").map(|s| s.as_str());
            let content_type = response.headers.get("content-type").map(|s| s.as_str());
            if is_cacheable_response(response.status, cache_control, content_type) {
                let ttl = resolve_ttl(
                    cache_control,
                    response.headers.get("expires").map(|s| s.as_str()),
                    cache.default_ttl(),
                );
                cache.set(
                    key,
                    CachedResponse {
                        status: response.status,
                        headers: response.headers.clone().into_iter().collect(),
                        body: response.body.to_vec(),
                    },
                    ttl,
                );
            }
        }

        self.inject_gateway_headers(&ctx, &decision.service, started_at, "MISS", &mut response.headers);

        Ok(response)
    }

    /// Sets the client-visible `X-Gateway-Service`/`X-Gateway-Response-Time`/
    /// `X-Cache` headers and, if the request named a deprecated API version,
    /// `X-API-Deprecation`/`Sunset` (SPEC_FULL.md §8 scenarios 1, 3, 6).
    fn inject_gateway_headers(
        &self,
        ctx: &RequestContext,
        service_name: &str,
        started_at: Instant,
        cache_status: &str,
        headers: &mut HashMap<String, String>,
    ) {
        headers.insert("x-gateway-service".to_string(), service_name.to_string());
        headers.insert(
            "x-gateway-response-time".to_string(),
            format!("{}ms", started_at.elapsed().as_millis()),
        );
        headers.insert("x-cache".to_string(), cache_status.to_string());

        if let Some(requested_version) = ctx.header(&self.deprecation.version_header) {
            if let Some(entry) = self.deprecation.versions.iter().find(|v| v.version == requested_version) {
                headers.insert(
                    "x-api-deprecation".to_string(),
                    entry
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("API version {requested_version} is deprecated")),
                );
                if let Some(sunset) = &entry.sunset {
                    headers.insert("sunset".to_string(), sunset.clone());
                }
            }
        }
    }

    fn apply_routing_decision(ctx: &mut RequestContext, decision: &crate::routing::RoutingDecision) {
        if let Some(path) = &decision.path_override {
            ctx.path = path.clone();
        }
        if !decision.query_edits.is_empty() {
            ctx.merge_query(&decision.query_edits);
        }
        for (name, value) in &decision.header_edits {
            ctx.headers.insert(name.to_lowercase(), value.clone());
        }
    }

    async fn execute_once(
        &self,
        service_name: &str,
        instance: &Arc<Instance>,
        method: Method,
        ctx: &RequestContext,
        breaker: &CircuitBreaker,
        timeout: Duration,
    ) -> Result<ResponseParts, GatewayError> {
        let url = build_target_url(&instance.base_url, &ctx.path, &ctx.raw_query);
        let headers = Self::build_outbound_headers(ctx, service_name);
        let body = ctx.body.clone();
        let pool = self.pool.clone();

        instance.begin_request();
        let outcome = breaker
            .call(async {
                let response = pool.execute(service_name, method, &url, headers, body, timeout).await?;
                let status = response.status().as_u16();
                if breaker.is_retriable_status(status) {
                    return Err(GatewayError::Upstream {
                        message: format!("upstream returned retriable status {status}"),
                        url: url.clone(),
                        status: Some(status),
                    });
                }
                Self::to_response_parts(response).await
            })
            .await;
        instance.end_request();

        match outcome {
            Ok(parts) => Ok(parts),
            Err(CircuitBreakerError::CircuitOpen) => Err(GatewayError::CircuitOpen {
                service: service_name.to_string(),
            }),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }

    /// Builds the headers sent to the upstream instance: the inbound
    /// headers plus the gateway-injected `X-Forwarded-For`,
    /// `X-Forwarded-Proto`, `X-Gateway-Service` and `X-Gateway-Path`
    /// (SPEC_FULL.md §8 scenario 1).
    fn build_outbound_headers(ctx: &RequestContext, service_name: &str) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &ctx.headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&ctx.client_ip()) {
            headers.insert(reqwest::header::HeaderName::from_static("x-forwarded-for"), value);
        }
        headers.insert(
            reqwest::header::HeaderName::from_static("x-forwarded-proto"),
            reqwest::header::HeaderValue::from_static("http"),
        );
        if let Ok(value) = reqwest::header::HeaderValue::from_str(service_name) {
            headers.insert(reqwest::header::HeaderName::from_static("x-gateway-service"), value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&ctx.path) {
            headers.insert(reqwest::header::HeaderName::from_static("x-gateway-path"), value);
        }
        headers
    }

    async fn to_response_parts(response: reqwest::Response) -> Result<ResponseParts, GatewayError> {
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_string());
            }
        }
        let body = response.bytes().await.map_err(|e| GatewayError::Upstream {
            message: e.to_string(),
            url: String::new(),
            status: Some(status),
        })?;
        Ok(ResponseParts { status, headers, body })
    }
}
