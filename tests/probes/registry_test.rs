/*!
 * Registry Tests
 * Identity tracking, shutdown and registry-wide diagnostics
 */

use usdt_provider::{FireStats, UsdtError, UsdtRegistry};

#[test]
fn test_identity_reserved_while_alive() {
    let registry = UsdtRegistry::simulation();
    let provider = registry.create_provider("myapp", "core").unwrap();
    assert_eq!(registry.live_providers(), 1);

    assert!(matches!(
        registry.create_provider("myapp", "core"),
        Err(UsdtError::ProviderExists { .. })
    ));

    drop(provider);
    assert_eq!(registry.live_providers(), 0);
    assert!(registry.create_provider("myapp", "core").is_ok());
}

#[test]
fn test_shutdown_refuses_new_work() {
    let registry = UsdtRegistry::simulation();
    let sim = registry.simulation_backend().unwrap().clone();
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    let definition = registry.create_probe("f", "g", &["int"]).unwrap();

    assert!(registry.shutdown());
    assert!(!registry.shutdown());
    assert_eq!(
        registry.create_probe("f", "h", &["int"]).unwrap_err(),
        UsdtError::RegistryShutdown
    );

    // Existing providers keep working until dropped
    provider.add_probe(definition).unwrap();
    provider.enable().unwrap();
    sim.attach_tracer("");
    provider.probes()[0].fire(&[5.into()]);
    assert_eq!(registry.stats(), FireStats { fired: 1, skipped: 0, dropped: 0 });
}

#[test]
fn test_registries_are_independent() {
    let a = UsdtRegistry::simulation();
    let b = UsdtRegistry::simulation();

    let _pa = a.create_provider("myapp", "core").unwrap();
    let _pb = b.create_provider("myapp", "core").unwrap();
    a.shutdown();

    assert!(a.is_shut_down());
    assert!(!b.is_shut_down());
}

#[test]
fn test_unused_definition_released() {
    let registry = UsdtRegistry::simulation();
    let sim = registry.simulation_backend().unwrap().clone();

    let definition = registry.create_probe("f", "g", &["int"]).unwrap();
    assert_eq!(sim.pending_definitions(), 1);
    drop(definition);
    assert_eq!(sim.pending_definitions(), 0);
}
