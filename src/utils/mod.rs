//! Small, dependency-free helpers shared across the gateway.
//!
//! - [`path`] - URL construction for upstream forwarding

pub mod path;
