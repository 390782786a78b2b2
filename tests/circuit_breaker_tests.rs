//! Dispatcher-level circuit breaker behaviour against a mocked upstream.
//!
//! Unit-level breaker state transitions (threshold, half-open admission)
//! are covered inline in `src/services/circuit_breaker.rs`; these tests
//! exercise the breaker wired into `Dispatcher::dispatch`.

mod common;

use std::time::Instant;

use gateway_rs::context::RequestContext;
use gateway_rs::dispatcher::Dispatcher;
use gateway_rs::models::error::GatewayError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// SPEC_FULL.md end-to-end scenario 2: breaker opens.
#[tokio::test]
async fn breaker_opens_after_threshold_and_rejects_without_calling_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/charge"))
        .respond_with(ResponseTemplate::new(504))
        .expect(2)
        .mount(&upstream)
        .await;

    let mut cfg = common::single_service_config("payments", &[("i1", &upstream.uri(), 1)]);
    cfg.circuit_breaker.default.failure_threshold = 2;
    cfg.circuit_breaker.default.reset_timeout_secs = 60;
    let dispatcher = Dispatcher::new(&cfg).unwrap();

    for _ in 0..2 {
        let ctx = RequestContext::new("GET", "/payments/charge", Instant::now());
        let result = dispatcher.dispatch(ctx).await;
        assert!(matches!(result, Err(GatewayError::Upstream { .. })));
    }

    let ctx = RequestContext::new("GET", "/payments/charge", Instant::now());
    let result = dispatcher.dispatch(ctx).await;
    assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));

    upstream.verify().await;
}

#[tokio::test]
async fn breaker_stays_closed_while_upstream_succeeds() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/charge"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    let mut cfg = common::single_service_config("payments", &[("i1", &upstream.uri(), 1)]);
    cfg.circuit_breaker.default.failure_threshold = 2;
    let dispatcher = Dispatcher::new(&cfg).unwrap();

    for _ in 0..5 {
        let ctx = RequestContext::new("GET", "/payments/charge", Instant::now());
        let result = dispatcher.dispatch(ctx).await.unwrap();
        assert_eq!(result.status, 200);
    }
}
