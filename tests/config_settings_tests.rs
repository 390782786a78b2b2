//! Integration tests for `config::settings::load_settings` against real
//! files on disk: the env-var override, path-traversal guard, oversized-file
//! guard, and a happy-path load.

use std::fs;
use std::sync::Mutex;

use gateway_rs::config::settings::load_settings;

// `load_settings` reads a process-wide env var, so tests sharing it must
// not interleave.
static ENV_GUARD: Mutex<()> = Mutex::new(());

fn minimal_config_json() -> String {
    r#"{"version":1,"services":[{"name":"svc","instances":[{"id":"i1","base_url":"http://backend"}]}]}"#.to_string()
}

#[test]
fn missing_config_path_returns_error() {
    let _guard = ENV_GUARD.lock().unwrap();
    std::env::set_var("GATEWAY_CONFIG_PATH", "./does-not-exist-anywhere.json");
    let result = load_settings();
    std::env::remove_var("GATEWAY_CONFIG_PATH");
    assert!(result.is_err());
}

#[test]
fn valid_config_loads_from_configured_path() {
    let _guard = ENV_GUARD.lock().unwrap();
    let path = "./integration_settings_valid.json";
    fs::write(path, minimal_config_json()).unwrap();
    std::env::set_var("GATEWAY_CONFIG_PATH", path);
    let result = load_settings();
    std::env::remove_var("GATEWAY_CONFIG_PATH");
    fs::remove_file(path).ok();

    let config = result.unwrap();
    assert_eq!(config.services.len(), 1);
    assert_eq!(config.services[0].name, "svc");
}

#[test]
fn malformed_json_is_rejected() {
    let _guard = ENV_GUARD.lock().unwrap();
    let path = "./integration_settings_malformed.json";
    fs::write(path, "{ not json").unwrap();
    std::env::set_var("GATEWAY_CONFIG_PATH", path);
    let result = load_settings();
    std::env::remove_var("GATEWAY_CONFIG_PATH");
    fs::remove_file(path).ok();
    assert!(result.is_err());
}

#[test]
fn oversized_config_file_is_rejected() {
    let _guard = ENV_GUARD.lock().unwrap();
    let path = "./integration_settings_oversized.json";
    let oversized = vec![b' '; 11 * 1024 * 1024];
    fs::write(path, oversized).unwrap();
    std::env::set_var("GATEWAY_CONFIG_PATH", path);
    let result = load_settings();
    std::env::remove_var("GATEWAY_CONFIG_PATH");
    fs::remove_file(path).ok();
    assert!(result.is_err());
}

#[test]
fn path_outside_working_directory_is_rejected() {
    let _guard = ENV_GUARD.lock().unwrap();
    let outside = std::env::temp_dir().join("gateway_rs_outside_config_test.json");
    fs::write(&outside, minimal_config_json()).unwrap();
    std::env::set_var("GATEWAY_CONFIG_PATH", outside.to_str().unwrap());
    let result = load_settings();
    std::env::remove_var("GATEWAY_CONFIG_PATH");
    fs::remove_file(&outside).ok();
    assert!(result.is_err());
}
