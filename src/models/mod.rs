//! Data models and domain types for the gateway.
//!
//! - [`error`] — `GatewayError`, the dispatcher-visible failure surface
//! - [`instance`] — upstream `Instance` and its health state
//! - [`service`] — named `Service` grouping instances
//! - [`route`] — routing predicates, actions, and `RoutingRule`
//! - [`transform_rule`] — transformation-rule data model
//! - [`gateway_config`] — the top-level configuration document

pub mod error;
pub mod gateway_config;
pub mod instance;
pub mod route;
pub mod service;
pub mod transform_rule;
