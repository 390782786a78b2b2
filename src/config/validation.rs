//! Advanced configuration validation with detailed error reporting.
//!
//! This module provides comprehensive validation for gateway configuration,
//! including security checks, performance recommendations, and detailed
//! error reporting for troubleshooting, beyond the structural self-check in
//! [`crate::models::gateway_config::GatewayConfig::validate`].

use crate::models::gateway_config::GatewayConfig;
use log::{info, warn};
use std::collections::HashSet;

/// Result of configuration validation containing errors, warnings, and recommendations.
///
/// # Examples
///
/// ```
/// use gateway_rs::config::validation::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// result.add_error("Missing required field".to_string());
/// result.add_warning("Using default value".to_string());
/// result.add_recommendation("Consider enabling HTTPS".to_string());
///
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
/// assert_eq!(result.warnings.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the configuration is valid (no errors)
    pub is_valid: bool,
    /// Critical errors that prevent configuration use
    pub errors: Vec<String>,
    /// Non-critical issues that should be addressed
    pub warnings: Vec<String>,
    /// Suggestions for improving configuration
    pub recommendations: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_recommendation(&mut self, recommendation: String) {
        self.recommendations.push(recommendation);
    }
}

/// Enhanced configuration validator with security and performance checks.
///
/// Provides comprehensive validation including:
/// - Basic structure validation
/// - Security checks (HTTPS usage, path traversal)
/// - Performance analysis (rule count, dynamic path patterns)
/// - Routing rule conflict detection
///
/// # Examples
///
/// ```
/// # use std::fs;
/// # let config_content = r#"{"version": 1, "services": [{"name": "a", "instances": [{"id": "i1", "base_url": "http://a"}]}]}"#;
/// # fs::write("./config.json", config_content).unwrap();
/// use gateway_rs::config::settings::load_settings;
/// use gateway_rs::config::validation::ConfigValidator;
///
/// let config = load_settings().expect("Failed to load settings");
/// let result = ConfigValidator::validate_comprehensive(&config);
///
/// if !result.is_valid {
///     for error in &result.errors {
///         eprintln!("Error: {}", error);
///     }
/// }
/// # fs::remove_file("./config.json").ok();
/// ```
pub struct ConfigValidator;

impl ConfigValidator {
    /// Performs comprehensive validation of gateway configuration.
    pub fn validate_comprehensive(config: &GatewayConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_basic_structure(config, &mut result);
        Self::validate_security(config, &mut result);
        Self::validate_performance(config, &mut result);
        Self::validate_rule_conflicts(config, &mut result);
        Self::log_validation_results(&result);

        result
    }

    fn validate_basic_structure(config: &GatewayConfig, result: &mut ValidationResult) {
        if config.services.is_empty() {
            result.add_error(
                "No services configured - gateway will not handle any requests".to_string(),
            );
        }

        let mut seen_services = HashSet::new();
        for service in &config.services {
            if service.name.trim().is_empty() {
                result.add_error("service name must not be empty".to_string());
            }
            if !seen_services.insert(&service.name) {
                result.add_error(format!("duplicate service name '{}'", service.name));
            }
            if service.instances.is_empty() {
                result.add_error(format!("service '{}' has no instances", service.name));
            }
        }

        for (index, rule) in config.routing.rules.iter().enumerate() {
            if let Err(error) = rule.validate() {
                result.add_error(format!("Routing rule {} validation failed: {}", index, error));
            }
            if !seen_services.contains(&rule.service) {
                result.add_error(format!(
                    "routing rule {} references unknown service '{}'",
                    index, rule.service
                ));
            }
        }
    }

    fn validate_security(config: &GatewayConfig, result: &mut ValidationResult) {
        let mut http_instances = 0;
        let mut https_instances = 0;

        for service in &config.services {
            for instance in &service.instances {
                if instance.base_url.starts_with("http://") {
                    http_instances += 1;
                    if instance.base_url.contains("localhost")
                        || instance.base_url.contains("127.0.0.1")
                    {
                        result.add_warning(format!(
                            "HTTP instance to localhost detected: {} - consider HTTPS for production",
                            instance.base_url
                        ));
                    } else {
                        result.add_warning(format!(
                            "Insecure HTTP instance detected: {} - consider HTTPS",
                            instance.base_url
                        ));
                    }
                } else if instance.base_url.starts_with("https://") {
                    https_instances += 1;
                }
            }
        }

        if http_instances > 0 && https_instances == 0 {
            result.add_warning(
                "All upstream instances use HTTP - consider HTTPS for production security"
                    .to_string(),
            );
        }

        for rule in &config.routing.rules {
            for predicate in &rule.predicates {
                if predicate.value.contains("..") {
                    result.add_error(format!(
                        "Path traversal pattern detected in rule predicate for service '{}'",
                        rule.service
                    ));
                }
            }
        }
    }

    fn validate_performance(config: &GatewayConfig, result: &mut ValidationResult) {
        let dynamic_rules = config
            .routing
            .rules
            .iter()
            .filter(|r| r.predicates.iter().any(|p| p.value.contains('{')))
            .count();

        if dynamic_rules > 50 {
            result.add_warning(format!(
                "High number of dynamic routing rules ({}) may impact performance - consider route optimization",
                dynamic_rules
            ));
        }

        if config.routing.rules.len() > 200 {
            result.add_recommendation(
                "Large rule set - consider splitting rarely-hit rules behind a lower priority"
                    .to_string(),
            );
        }
    }

    fn validate_rule_conflicts(config: &GatewayConfig, result: &mut ValidationResult) {
        let mut priorities_seen: HashSet<i32> = HashSet::new();
        let mut duplicate_priorities = HashSet::new();
        for rule in &config.routing.rules {
            if !priorities_seen.insert(rule.priority) {
                duplicate_priorities.insert(rule.priority);
            }
        }
        for priority in duplicate_priorities {
            result.add_warning(format!(
                "Multiple routing rules share priority {} - evaluation order between them is unspecified",
                priority
            ));
        }
    }

    fn log_validation_results(result: &ValidationResult) {
        if result.is_valid {
            info!("Configuration validation passed");
        } else {
            for error in &result.errors {
                log::error!("Validation error: {}", error);
            }
        }

        for warning in &result.warnings {
            warn!("Validation warning: {}", warning);
        }

        for recommendation in &result.recommendations {
            info!("Recommendation: {}", recommendation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gateway_config::{InstanceConfig, ServiceConfig};

    fn minimal_config() -> GatewayConfig {
        let mut cfg = GatewayConfig::default();
        cfg.services.push(ServiceConfig {
            name: "svc-a".to_string(),
            instances: vec![InstanceConfig {
                id: "i1".to_string(),
                base_url: "http://backend:8080".to_string(),
                weight: 1,
                health_check_path: "/health".to_string(),
            }],
        });
        cfg
    }

    #[test]
    fn empty_config_is_invalid() {
        let result = ConfigValidator::validate_comprehensive(&GatewayConfig::default());
        assert!(!result.is_valid);
    }

    #[test]
    fn minimal_valid_config_passes() {
        let result = ConfigValidator::validate_comprehensive(&minimal_config());
        assert!(result.is_valid);
    }

    #[test]
    fn http_backend_produces_warning() {
        let result = ConfigValidator::validate_comprehensive(&minimal_config());
        assert!(result.warnings.iter().any(|w| w.contains("HTTP")));
    }
}
