//! HTTP route handlers and endpoint definitions for the gateway.
//!
//! This module contains the web interface layer that clients interact with:
//! health checks and the catch-all proxy route that hands every other
//! request to the [`crate::dispatcher::Dispatcher`].
//!
//! # Module Organization
//!
//! - [`health`] - Health check endpoints for monitoring and Kubernetes probes
//! - [`http`] - Catch-all proxy route wired to the `Dispatcher`
//!
//! # Route Architecture
//!
//! ```text
//! Client Request → actix_web handler → RequestContext → Dispatcher → Upstream Service
//! ```
//!
//! # Examples
//!
//! ```rust
//! use actix_web::{App, web};
//! use gateway_rs::routes::health::configure_health;
//!
//! let app = App::new().configure(configure_health);
//! ```

pub mod health;
pub mod http;
