use crate::models::gateway_config::GatewayConfig;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Loads and validates the gateway configuration document from disk.
///
/// # Configuration File Location
///
/// The configuration file path is determined by:
/// 1. `GATEWAY_CONFIG_PATH` environment variable (if set)
/// 2. Default: `./config.json` (relative to current working directory)
///
/// # Security Features
///
/// - **Path Traversal Protection**: Ensures config file is within working directory
/// - **File Size Limits**: Prevents memory exhaustion attacks (max 10MB)
/// - **Path Canonicalization**: Resolves symlinks and relative paths safely
///
/// # Examples
///
/// ```rust
/// # use std::fs;
/// # let config_content = r#"{"version": 1, "services": [{"name": "a", "instances": [{"id": "i1", "base_url": "http://a"}]}]}"#;
/// # fs::write("./config.json", config_content).unwrap();
/// use gateway_rs::config::settings::load_settings;
///
/// let config = load_settings().expect("Failed to load configuration");
/// println!("Loaded {} services", config.services.len());
/// # fs::remove_file("./config.json").ok();
/// ```
pub fn load_settings() -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("GATEWAY_CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_string());

    debug!("Loading configuration from: {}", config_path);

    let path = Path::new(&config_path);

    if !path.exists() {
        return Err(format!("Cannot resolve config path '{}'", config_path).into());
    }

    let canonical_path = path
        .canonicalize()
        .map_err(|e| format!("Cannot resolve config path '{}': {}", config_path, e))?;

    let current_dir =
        std::env::current_dir().map_err(|e| format!("Cannot get current directory: {}", e))?;

    if !canonical_path.starts_with(&current_dir) {
        warn!("Config path '{}' is outside working directory", config_path);
        return Err("Config path outside working directory".into());
    }

    let metadata = fs::metadata(&canonical_path)
        .map_err(|e| format!("Cannot read config file metadata: {}", e))?;

    const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(format!(
            "Config file too large: {} bytes (max: {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        )
        .into());
    }

    let config_data = fs::read_to_string(&canonical_path)
        .map_err(|e| format!("Cannot read config file: {}", e))?;

    let config: GatewayConfig =
        serde_json::from_str(&config_data).map_err(|e| format!("Invalid JSON: {}", e))?;

    debug!(
        "Successfully loaded configuration with {} services",
        config.services.len()
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_file_returns_error() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::set_var("GATEWAY_CONFIG_PATH", "./does-not-exist.json");
        let result = load_settings();
        std::env::remove_var("GATEWAY_CONFIG_PATH");
        assert!(result.is_err());
    }

    #[test]
    fn valid_file_loads_into_gateway_config() {
        let _guard = ENV_GUARD.lock().unwrap();
        let path = "./settings_test_config.json";
        fs::write(
            path,
            r#"{"version":1,"services":[{"name":"a","instances":[{"id":"i1","base_url":"http://a"}]}]}"#,
        )
        .unwrap();
        std::env::set_var("GATEWAY_CONFIG_PATH", path);
        let config = load_settings().unwrap();
        std::env::remove_var("GATEWAY_CONFIG_PATH");
        fs::remove_file(path).ok();
        assert_eq!(config.services.len(), 1);
    }
}
