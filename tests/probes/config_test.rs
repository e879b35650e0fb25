/*!
 * Configuration Tests
 * Environment and file sources
 */

use serial_test::serial;
use std::io::Write;
use usdt_provider::{BackendKind, CoercionPolicy, UsdtConfig, UsdtError, UsdtRegistry};

const VARS: [&str; 4] = [
    "USDT_BACKEND",
    "USDT_COERCION",
    "USDT_MAX_PROBES",
    "USDT_EVENT_HISTORY",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_defaults() {
    clear_env();
    assert_eq!(UsdtConfig::from_env().unwrap(), UsdtConfig::default());
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("USDT_BACKEND", "simulation");
    std::env::set_var("USDT_COERCION", "permissive");
    std::env::set_var("USDT_MAX_PROBES", "16");
    std::env::set_var("USDT_EVENT_HISTORY", "100");

    let config = UsdtConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.backend, BackendKind::Simulation);
    assert_eq!(config.coercion, CoercionPolicy::Permissive);
    assert_eq!(config.max_probes_per_provider, 16);
    assert_eq!(config.event_history, 100);
}

#[test]
#[serial]
fn test_env_invalid_values() {
    clear_env();
    std::env::set_var("USDT_MAX_PROBES", "lots");
    let result = UsdtConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(UsdtError::Config { .. })));

    std::env::set_var("USDT_COERCION", "loose");
    let result = UsdtConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(UsdtError::Config { .. })));
}

#[test]
#[serial]
fn test_registry_from_env() {
    clear_env();
    std::env::set_var("USDT_BACKEND", "sim");
    let registry = UsdtRegistry::from_env();
    clear_env();

    let registry = registry.unwrap();
    assert!(registry.simulation_backend().is_some());
}

#[test]
fn test_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"backend":"simulation","max_probes_per_provider":8}"#)
        .unwrap();

    let config = UsdtConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.backend, BackendKind::Simulation);
    assert_eq!(config.max_probes_per_provider, 8);
    assert_eq!(config.coercion, CoercionPolicy::Strict);
}

#[test]
fn test_json_file_out_of_range() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"max_probes_per_provider":100000}"#).unwrap();
    assert!(matches!(
        UsdtConfig::from_json_file(file.path()),
        Err(UsdtError::Config { .. })
    ));
}
