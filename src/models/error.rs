//! Gateway-wide error type with HTTP response mapping.
//!
//! Every fallible operation in the dispatcher, routing engine, load balancer,
//! circuit breaker, cache and transformation pipeline converges on
//! [`GatewayError`]. A single `thiserror`-derived enum keeps the mapping from
//! internal failure to client-visible response in one place instead of
//! scattered across handlers.

use actix_web::HttpResponse;
use chrono::Utc;
use serde_json::json;

/// All gateway-visible failure kinds.
///
/// Each variant implements [`actix_web::error::ResponseError`] by mapping to
/// a status code and a `{error, path, method, timestamp}` JSON body. `path`
/// and `method` are best-effort: callers that don't have a request in scope
/// (e.g. background health probes) pass empty strings.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No configured route matched the request path.
    #[error("no route matches path {path}")]
    RouteNotFound { path: String },

    /// A route or rule references something invalid (bad pattern, missing
    /// backend, malformed transform).
    #[error("invalid configuration for route {route}: {message}")]
    Config { message: String, route: String },

    /// The route matched but the request method is not permitted on it.
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    /// The circuit breaker guarding the selected upstream is open.
    #[error("circuit breaker open for {service}")]
    CircuitOpen { service: String },

    /// The upstream request exceeded its deadline.
    #[error("upstream request timed out after {timeout}s")]
    Timeout { timeout: u64 },

    /// The upstream connection failed or returned a transport-level error.
    #[error("upstream error calling {url}: {message}")]
    Upstream {
        message: String,
        url: String,
        status: Option<u16>,
    },

    /// No healthy instance was available for the selected service.
    #[error("no healthy instance available for service {service}")]
    NoHealthyInstance { service: String },

    /// A routing rule matched but its action could not be resolved to a
    /// dispatchable target (e.g. an `abort` action, or a redirect loop).
    #[error("no action resolved for path {path}")]
    NoRuleMatched { path: String },

    /// The caller exceeded its allotted request rate. Token-bucket mechanics
    /// live with an external collaborator; the gateway only surfaces the
    /// verdict.
    #[error("rate limit exceeded")]
    RateLimitError,

    /// A request or response failed schema/size/content validation.
    #[error("validation failed: {message}")]
    ValidationError { message: String },

    /// A request or response transformation could not be applied.
    #[error("transformation failed: {message}")]
    TransformError { message: String },

    /// The response cache failed to read or write an entry.
    #[error("cache error: {message}")]
    CacheError { message: String },

    /// Catch-all for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    fn kind(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::Config { .. } => "config",
            GatewayError::MethodNotAllowed { .. } => "method_not_allowed",
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Upstream { .. } => "upstream",
            GatewayError::NoHealthyInstance { .. } => "no_healthy_instance",
            GatewayError::NoRuleMatched { .. } => "no_rule_matched",
            GatewayError::RateLimitError => "rate_limited",
            GatewayError::ValidationError { .. } => "validation",
            GatewayError::TransformError { .. } => "transform",
            GatewayError::CacheError { .. } => "cache",
            GatewayError::Internal(_) => "internal",
        }
    }

    fn path(&self) -> String {
        match self {
            GatewayError::RouteNotFound { path } => path.clone(),
            GatewayError::MethodNotAllowed { path, .. } => path.clone(),
            GatewayError::NoRuleMatched { path } => path.clone(),
            _ => String::new(),
        }
    }

    fn method(&self) -> String {
        match self {
            GatewayError::MethodNotAllowed { method, .. } => method.clone(),
            _ => String::new(),
        }
    }

    fn body(&self) -> serde_json::Value {
        json!({
            "error": self.to_string(),
            "type": self.kind(),
            "path": self.path(),
            "method": self.method(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

impl actix_web::error::ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let body = self.body();
        match self {
            GatewayError::RouteNotFound { .. } => HttpResponse::NotFound().json(body),
            GatewayError::Config { .. } => HttpResponse::BadGateway().json(body),
            GatewayError::MethodNotAllowed { .. } => {
                HttpResponse::MethodNotAllowed().json(body)
            }
            GatewayError::CircuitOpen { .. } => HttpResponse::ServiceUnavailable().json(body),
            GatewayError::Timeout { .. } => HttpResponse::GatewayTimeout().json(body),
            GatewayError::Upstream { status, .. } => {
                let code = status
                    .and_then(|s| actix_web::http::StatusCode::from_u16(s).ok())
                    .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
                HttpResponse::build(code).json(body)
            }
            GatewayError::NoHealthyInstance { .. } => {
                HttpResponse::ServiceUnavailable().json(body)
            }
            GatewayError::NoRuleMatched { .. } => HttpResponse::NotFound().json(body),
            GatewayError::RateLimitError => HttpResponse::TooManyRequests().json(body),
            GatewayError::ValidationError { .. } => HttpResponse::BadRequest().json(body),
            GatewayError::TransformError { .. } => HttpResponse::BadGateway().json(body),
            GatewayError::CacheError { .. } => HttpResponse::InternalServerError().json(body),
            GatewayError::Internal(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::ResponseError;

    #[test]
    fn route_not_found_maps_to_404() {
        let err = GatewayError::RouteNotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.error_response().status(), 404);
    }

    #[test]
    fn circuit_open_maps_to_503() {
        let err = GatewayError::CircuitOpen {
            service: "payments".into(),
        };
        assert_eq!(err.error_response().status(), 503);
    }

    #[test]
    fn upstream_prefers_propagated_status() {
        let err = GatewayError::Upstream {
            message: "boom".into(),
            url: "http://backend".into(),
            status: Some(418),
        };
        assert_eq!(err.error_response().status(), 418);
    }

    #[test]
    fn rate_limit_maps_to_429() {
        assert_eq!(
            GatewayError::RateLimitError.error_response().status(),
            429
        );
    }
}
