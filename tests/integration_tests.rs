//! End-to-end dispatcher tests against a mocked upstream.

mod common;

use std::time::Instant;

use actix_web::{test, App};
use gateway_rs::context::RequestContext;
use gateway_rs::dispatcher::Dispatcher;
use gateway_rs::routes::health::configure_health;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[actix_web::test]
async fn health_endpoint_reports_healthy() {
    let app = test::init_service(App::new().configure(configure_health)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn readiness_and_liveness_endpoints_respond() {
    let app = test::init_service(App::new().configure(configure_health)).await;
    for probe_path in ["/ready", "/live"] {
        let req = test::TestRequest::get().uri(probe_path).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success(), "{probe_path} did not return success");
    }
}

// SPEC_FULL.md end-to-end scenario 1: route and forward.
#[tokio::test]
async fn dispatch_routes_and_forwards_to_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .and(header_exists("x-gateway-service"))
        .and(header_exists("x-forwarded-for"))
        .respond_with(ResponseTemplate::new(200).set_body_string("order-42"))
        .mount(&upstream)
        .await;

    let cfg = common::single_service_config("orders", &[("i1", &upstream.uri(), 1)]);
    let dispatcher = Dispatcher::new(&cfg).unwrap();

    let ctx = RequestContext::new("GET", "/orders/42", Instant::now());
    let response = dispatcher.dispatch(ctx).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_ref(), b"order-42");
    assert_eq!(response.headers.get("x-gateway-service").map(String::as_str), Some("orders"));
    assert_eq!(response.headers.get("x-cache").map(String::as_str), Some("MISS"));
    assert!(response.headers.contains_key("x-gateway-response-time"));
}

#[tokio::test]
async fn dispatch_propagates_upstream_error_status() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let cfg = common::single_service_config("orders", &[("i1", &upstream.uri(), 1)]);
    let dispatcher = Dispatcher::new(&cfg).unwrap();

    let ctx = RequestContext::new("GET", "/orders/missing", Instant::now());
    let response = dispatcher.dispatch(ctx).await.unwrap();
    assert_eq!(response.status, 404);
}

// SPEC_FULL.md end-to-end scenario 3: cache hit.
#[tokio::test]
async fn repeated_get_is_served_from_cache_without_a_second_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("items")
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let mut cfg = common::single_service_config("catalog", &[("i1", &upstream.uri(), 1)]);
    cfg.cache.enabled = true;
    cfg.cache.default_ttl_secs = 60;
    let dispatcher = Dispatcher::new(&cfg).unwrap();

    let first = dispatcher
        .dispatch(RequestContext::new("GET", "/catalog/items", Instant::now()))
        .await
        .unwrap();
    let second = dispatcher
        .dispatch(RequestContext::new("GET", "/catalog/items", Instant::now()))
        .await
        .unwrap();

    assert_eq!(first.status, 200);
    assert_eq!(second.body.as_ref(), b"items");
    assert_eq!(first.headers.get("x-cache").map(String::as_str), Some("MISS"));
    assert_eq!(second.headers.get("x-cache").map(String::as_str), Some("HIT"));
    assert_eq!(second.headers.get("x-gateway-service").map(String::as_str), Some("catalog"));
    upstream.verify().await;
}
