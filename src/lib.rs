//! A configurable, rule-driven HTTP API gateway.
//!
//! The gateway evaluates an inbound request against a priority-ordered
//! routing rule set ([`routing`]), applies any matching request/response
//! transformations ([`transform`]), optionally serves from an in-memory
//! response cache ([`cache`]), and forwards to a load-balanced
//! ([`balancer`]), circuit-breaker-guarded ([`services::circuit_breaker`])
//! upstream instance over a pooled connection ([`pool`]). The
//! [`dispatcher::Dispatcher`] composes all of this into one per-request call.
//!
//! # Module Organization
//!
//! - [`models`] — configuration and domain data types
//! - [`context`] — the transient per-request [`context::RequestContext`]
//! - [`routing`] — the routing decision engine
//! - [`transform`] — the request/response transformation pipeline
//! - [`cache`] — the response cache
//! - [`balancer`] — load-balancing strategies and health tracking
//! - [`services`] — the circuit breaker
//! - [`pool`] — pooled upstream HTTP clients
//! - [`dispatcher`] — wires the above into `Dispatcher::dispatch`
//! - [`config`] — configuration loading, validation, and hot reload
//! - [`routes`] — actix-web route handlers
//! - [`logs`] — structured logging setup
//! - [`utils`] — small shared helpers

pub mod balancer;
pub mod cache;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod logs;
pub mod models;
pub mod pool;
pub mod routes;
pub mod routing;
pub mod services;
pub mod transform;
pub mod utils;
