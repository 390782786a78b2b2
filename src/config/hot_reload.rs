//! Configuration hot-reload functionality for zero-downtime updates.
//!
//! This module provides the ability to reload gateway configuration without
//! restarting the service, enabling dynamic routing-rule and service updates
//! in production environments.

use crate::config::validation::ConfigValidator;
use crate::models::gateway_config::GatewayConfig;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;

/// Represents a configuration update event.
///
/// Contains the new configuration, timestamp of the update, and a
/// monotonically increasing version number for tracking configuration
/// changes.
///
/// # Examples
///
/// ```
/// use gateway_rs::config::hot_reload::ConfigUpdate;
/// use gateway_rs::models::gateway_config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// let update = ConfigUpdate {
///     config,
///     timestamp: chrono::Utc::now(),
///     version: 1,
/// };
///
/// println!("Config version: {}", update.version);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    /// The updated gateway configuration
    pub config: GatewayConfig,
    /// When this configuration was loaded
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Monotonically increasing version number
    pub version: u64,
}

/// Watches a configuration file for changes and broadcasts updates.
///
/// Monitors the configuration file for modifications and automatically
/// reloads and validates the new configuration. Broadcasts updates to all
/// subscribers; the dispatcher is not itself swapped — callers decide how to
/// apply a [`ConfigUpdate`] (typically by rebuilding the `Dispatcher`).
///
/// # Examples
///
/// ```no_run
/// use gateway_rs::config::hot_reload::ConfigWatcher;
/// use gateway_rs::models::gateway_config::GatewayConfig;
///
/// # async fn example() {
/// let config = GatewayConfig::default();
/// let watcher = ConfigWatcher::new(config, "./config.json".to_string());
///
/// watcher.start_watching().await;
/// let mut receiver = watcher.subscribe();
/// # }
/// ```
pub struct ConfigWatcher {
    current_config: Arc<RwLock<ConfigUpdate>>,
    config_path: String,
    update_sender: broadcast::Sender<ConfigUpdate>,
    version_counter: Arc<std::sync::atomic::AtomicU64>,
}

impl ConfigWatcher {
    /// Creates a new configuration watcher.
    pub fn new(initial_config: GatewayConfig, config_path: String) -> Self {
        let (update_sender, _) = broadcast::channel(100);

        let initial_update = ConfigUpdate {
            config: initial_config,
            timestamp: chrono::Utc::now(),
            version: 1,
        };

        Self {
            current_config: Arc::new(RwLock::new(initial_update)),
            config_path,
            update_sender,
            version_counter: Arc::new(std::sync::atomic::AtomicU64::new(1)),
        }
    }

    /// Gets the current configuration.
    pub async fn get_current_config(&self) -> ConfigUpdate {
        self.current_config.read().await.clone()
    }

    /// Subscribes to configuration update notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigUpdate> {
        self.update_sender.subscribe()
    }

    /// Starts watching the configuration file for changes.
    ///
    /// Spawns a background task that checks the file every 5 seconds for
    /// modifications and automatically reloads when changes are detected.
    pub async fn start_watching(&self) {
        let mut interval = interval(Duration::from_secs(5));
        let config_path = self.config_path.clone();
        let current_config = self.current_config.clone();
        let update_sender = self.update_sender.clone();
        let version_counter = self.version_counter.clone();

        tokio::spawn(async move {
            let mut last_modified = get_file_modified_time(&config_path).await;

            loop {
                interval.tick().await;

                match get_file_modified_time(&config_path).await {
                    Some(modified_time) => {
                        if Some(modified_time) != last_modified {
                            info!("Configuration file changed, reloading...");

                            match Self::reload_config(&config_path).await {
                                Ok(new_config) => {
                                    let version = version_counter
                                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                                        + 1;
                                    let update = ConfigUpdate {
                                        config: new_config,
                                        timestamp: chrono::Utc::now(),
                                        version,
                                    };

                                    *current_config.write().await = update.clone();

                                    if let Err(e) = update_sender.send(update) {
                                        warn!("Failed to broadcast config update: {}", e);
                                    } else {
                                        info!("Configuration reloaded successfully (version {})", version);
                                    }

                                    last_modified = Some(modified_time);
                                }
                                Err(e) => {
                                    error!("Failed to reload configuration: {}", e);
                                }
                            }
                        }
                    }
                    None => {
                        warn!("Could not get modification time for config file: {}", config_path);
                    }
                }
            }
        });
    }

    async fn reload_config(config_path: &str) -> Result<GatewayConfig, String> {
        let new_config = load_config_from_path(config_path)
            .map_err(|e| format!("Failed to load config: {}", e))?;

        new_config
            .validate()
            .map_err(|e| format!("Configuration structurally invalid: {}", e))?;

        let validation_result = ConfigValidator::validate_comprehensive(&new_config);
        if !validation_result.is_valid {
            return Err(format!(
                "Configuration validation failed: {}",
                validation_result.errors.join(", ")
            ));
        }

        for warning in &validation_result.warnings {
            warn!("Config validation warning: {}", warning);
        }

        Ok(new_config)
    }

    /// Manually triggers a configuration reload.
    pub async fn manual_reload(&self) -> Result<ConfigUpdate, String> {
        let new_config = Self::reload_config(&self.config_path).await?;

        let version = self.version_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        let update = ConfigUpdate {
            config: new_config,
            timestamp: chrono::Utc::now(),
            version,
        };

        *self.current_config.write().await = update.clone();

        if let Err(e) = self.update_sender.send(update.clone()) {
            warn!("Failed to broadcast manual config update: {}", e);
        }

        info!("Configuration manually reloaded (version {})", version);
        Ok(update)
    }
}

async fn get_file_modified_time(path: &str) -> Option<std::time::SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

fn load_config_from_path(path: &str) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let config_content = std::fs::read_to_string(path)?;
    let config: GatewayConfig = serde_json::from_str(&config_content)?;
    Ok(config)
}

/// Configuration management service that handles hot-reload and provides
/// the current configuration to other services.
pub struct ConfigManager {
    watcher: ConfigWatcher,
}

impl ConfigManager {
    /// Creates a new configuration manager.
    pub fn new(initial_config: GatewayConfig, config_path: String) -> Self {
        Self {
            watcher: ConfigWatcher::new(initial_config, config_path),
        }
    }

    /// Starts the configuration file watcher.
    pub async fn start(&self) {
        info!("Starting configuration hot-reload watcher");
        self.watcher.start_watching().await;
    }

    /// Gets the current configuration.
    pub async fn get_current_config(&self) -> ConfigUpdate {
        self.watcher.get_current_config().await
    }

    /// Subscribes to configuration update notifications.
    pub fn subscribe_to_updates(&self) -> broadcast::Receiver<ConfigUpdate> {
        self.watcher.subscribe()
    }

    /// Manually triggers a configuration reload.
    pub async fn reload_now(&self) -> Result<ConfigUpdate, String> {
        self.watcher.manual_reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watcher_starts_at_version_one() {
        let watcher = ConfigWatcher::new(GatewayConfig::default(), "./config.json".to_string());
        let update = watcher.get_current_config().await;
        assert_eq!(update.version, 1);
    }

    #[tokio::test]
    async fn manual_reload_rejects_missing_file() {
        let watcher =
            ConfigWatcher::new(GatewayConfig::default(), "./no-such-config.json".to_string());
        assert!(watcher.manual_reload().await.is_err());
    }
}
