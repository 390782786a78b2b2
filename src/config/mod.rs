//! Configuration management for the gateway.
//!
//! This module handles loading the [`crate::models::gateway_config::GatewayConfig`]
//! document from disk, validating it, and watching it for hot-reload.
//!
//! # Module Organization
//!
//! - [`settings`] - Configuration file loading
//! - [`validation`] - Detailed structural, security and performance validation
//! - [`hot_reload`] - Zero-downtime configuration reload
//!
//! # Configuration Sources
//!
//! 1. **Environment Variables**: `GATEWAY_CONFIG_PATH`, `GATEWAY_HOST`, `GATEWAY_PORT`
//! 2. **Configuration File**: Primary source (JSON document, see [`crate::models::gateway_config::GatewayConfig`])
//! 3. **Default Values**: Built-in fallback values for every optional field
//!
//! # Security Features
//!
//! - **Path Traversal Protection**: Prevents access to files outside working directory
//! - **File Size Limits**: Prevents memory exhaustion attacks
//! - **Safe Defaults**: Secure default values for all optional settings
//!
//! # Environment Variables
//!
//! - `GATEWAY_CONFIG_PATH`: Path to configuration file (default: `./config.json`)
//! - `GATEWAY_HOST`: Server bind address (default: `0.0.0.0`)
//! - `GATEWAY_PORT`: Server port number (default: `5900`)
//! - `NO_COLOR`: Disable colored log output
//!
//! # Examples
//!
//! ```rust
//! # use std::fs;
//! # let config_content = r#"{"version": 1, "services": [{"name": "a", "instances": [{"id": "i1", "base_url": "http://a"}]}]}"#;
//! # fs::write("./config.json", config_content).unwrap();
//! use gateway_rs::config::settings::load_settings;
//!
//! let config = load_settings().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! println!("Loaded {} services", config.services.len());
//! # fs::remove_file("./config.json").ok();
//! ```

pub mod hot_reload;
pub mod settings;
pub mod validation;
