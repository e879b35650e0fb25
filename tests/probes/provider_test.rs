/*!
 * Provider Lifecycle Tests
 * Creation, attachment, activation and disposal through the public API
 */

use pretty_assertions::assert_eq;
use usdt_provider::{
    ArgValue, ProviderState, SimulationBackend, TracingBackend, UsdtConfig, UsdtError, UsdtRegistry,
};

fn registry() -> (UsdtRegistry, SimulationBackend) {
    let registry = UsdtRegistry::simulation();
    let sim = registry.simulation_backend().unwrap().clone();
    (registry, sim)
}

#[test]
fn test_identity_matches_inputs() {
    let (registry, _sim) = registry();
    let provider = registry.create_provider("myapp", "core").unwrap();

    assert_eq!(provider.name(), "myapp");
    assert_eq!(provider.module(), "core");
    assert_eq!(provider.state(), ProviderState::Unregistered);
}

#[test]
fn test_overlong_identifier_rejected() {
    let (registry, _sim) = registry();
    let name = "p".repeat(65);
    assert!(matches!(
        registry.create_provider(&name, "core"),
        Err(UsdtError::InvalidIdentifier { .. })
    ));
}

#[test]
fn test_failed_duplicate_attach_leaves_count() {
    let (registry, _sim) = registry();
    let mut provider = registry.create_provider("myapp", "core").unwrap();

    provider
        .add_probe(registry.create_probe("doWork", "start", &["int"]).unwrap())
        .unwrap();
    let before = provider.probe_count();

    let err = provider
        .add_probe(registry.create_probe("doWork", "start", &["int"]).unwrap())
        .unwrap_err();
    assert!(matches!(err, UsdtError::AlreadyAttached { .. }));
    assert_eq!(provider.probe_count(), before);
}

#[test]
fn test_same_probe_on_two_providers() {
    let (registry, _sim) = registry();
    let mut a = registry.create_provider("a", "core").unwrap();
    let mut b = registry.create_provider("b", "core").unwrap();

    a.add_probe(registry.create_probe("f", "g", &["int"]).unwrap())
        .unwrap();
    b.add_probe(registry.create_probe("f", "g", &["int"]).unwrap())
        .unwrap();

    assert_eq!(a.probe_count(), 1);
    assert_eq!(b.probe_count(), 1);
}

#[test]
fn test_disabled_before_enable() {
    let (registry, sim) = registry();
    sim.attach_tracer("");
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    for name in ["a", "b", "c"] {
        provider
            .add_probe(registry.create_probe("f", name, &["int"]).unwrap())
            .unwrap();
    }

    assert!(provider.probes().iter().all(|p| !p.is_enabled()));
    provider.enable().unwrap();
    assert!(provider.probes().iter().all(|p| p.is_enabled()));
}

#[test]
fn test_enable_surfaces_native_status() {
    let (registry, sim) = registry();
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    provider
        .add_probe(registry.create_probe("f", "g", &["int"]).unwrap())
        .unwrap();

    sim.inject_failure(usdt_provider::NativeOp::Enable, 22);
    match provider.enable().unwrap_err() {
        UsdtError::NativeSubsystemFailure {
            operation, status, ..
        } => {
            assert_eq!(operation, usdt_provider::NativeOp::Enable);
            assert_eq!(status, 22);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_create_provider_native_failure() {
    let (registry, sim) = registry();
    sim.inject_failure(usdt_provider::NativeOp::CreateProvider, -1);

    assert!(matches!(
        registry.create_provider("myapp", "core"),
        Err(UsdtError::NativeSubsystemFailure { .. })
    ));
    assert_eq!(registry.live_providers(), 0);
    assert!(registry.create_provider("myapp", "core").is_ok());
}

#[test]
fn test_info_serializes() {
    let (registry, _sim) = registry();
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    provider
        .add_probe(registry.create_probe("doWork", "start", &["int", "char *"]).unwrap())
        .unwrap();
    provider.enable().unwrap();

    let json = serde_json::to_value(provider.info()).unwrap();
    assert_eq!(json["state"], "enabled");
    assert_eq!(json["probes"][0]["arg_types"][1], "char *");
    assert_eq!(json["probes"][0]["stats"]["fired"], 0);
}

#[test]
fn test_provider_shared_across_threads() {
    let (registry, sim) = registry();
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    provider
        .add_probe(registry.create_probe("f", "g", &["int"]).unwrap())
        .unwrap();
    provider.enable().unwrap();
    sim.attach_tracer("myapp:core:f:g");

    std::thread::scope(|s| {
        for t in 0..4i64 {
            let provider = &provider;
            s.spawn(move || {
                let probe = provider.probe("f", "g").unwrap();
                for i in 0..250i64 {
                    probe.fire(&[ArgValue::from(t * 1000 + i)]);
                }
            });
        }
    });

    assert_eq!(provider.stats().fired, 1000);
    assert_eq!(sim.events().total_events(), 1000);
}

#[test]
fn test_drop_disposes_native_provider() {
    let (registry, sim) = registry();
    let handle = {
        let mut provider = registry.create_provider("myapp", "core").unwrap();
        provider
            .add_probe(registry.create_probe("f", "g", &["int"]).unwrap())
            .unwrap();
        provider.enable().unwrap();
        provider.handle()
    };

    assert!(!sim.is_provider_enabled(handle));
    assert_eq!(sim.provider_count(), 0);
    assert_eq!(registry.live_providers(), 0);
}

#[test]
fn test_attachment_limit_from_config() {
    let registry = UsdtRegistry::new(UsdtConfig::simulation().with_max_probes(1)).unwrap();
    assert!(!registry.backend().is_native());
    let mut provider = registry.create_provider("myapp", "core").unwrap();

    provider
        .add_probe(registry.create_probe("f", "a", &["int"]).unwrap())
        .unwrap();
    assert!(matches!(
        provider.add_probe(registry.create_probe("f", "b", &["int"]).unwrap()),
        Err(UsdtError::AttachmentLimitExceeded { max: 1, .. })
    ));
    assert!(registry.backend().is_supported());
}

#[test]
fn test_create_probe_native_failure() {
    let (registry, sim) = registry();
    sim.inject_failure(usdt_provider::NativeOp::CreateProbe, 5);

    match registry.create_probe("doWork", "start", &["int"]).unwrap_err() {
        UsdtError::NativeSubsystemFailure {
            operation, status, ..
        } => {
            assert_eq!(operation, usdt_provider::NativeOp::CreateProbe);
            assert_eq!(status, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sim.pending_definitions(), 0);

    // The failure is one-shot, through the backend-level constructor too
    sim.inject_failure(usdt_provider::NativeOp::CreateProbe, 6);
    assert!(matches!(
        usdt_provider::ProbeDefinition::new(registry.backend(), "doWork", "start", &["int"]),
        Err(UsdtError::NativeSubsystemFailure { status: 6, .. })
    ));
    assert_eq!(sim.pending_definitions(), 0);
    assert!(registry.create_probe("doWork", "start", &["int"]).is_ok());
}

#[test]
fn test_definition_from_another_registry_rejected() {
    let (first, first_sim) = registry();
    let (second, second_sim) = registry();
    second_sim.attach_tracer("");

    let foreign = first.create_probe("alpha", "start", &["int"]).unwrap();
    let _local = second.create_probe("beta", "other", &["char *"]).unwrap();

    let mut provider = second.create_provider("pb", "m").unwrap();
    match provider.add_probe(foreign) {
        Err(UsdtError::ForeignDefinition { function, name }) => {
            assert_eq!(function.as_str(), "alpha");
            assert_eq!(name.as_str(), "start");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert_eq!(provider.probe_count(), 0);
    assert_eq!(provider.state(), ProviderState::Unregistered);
    // The rejected definition is released on its own backend only
    assert_eq!(first_sim.pending_definitions(), 0);
    assert_eq!(second_sim.pending_definitions(), 1);
    assert_eq!(second_sim.attached_probe_count(), 0);
}

#[test]
fn test_definition_shared_backend_accepted() {
    let sim = SimulationBackend::new();
    let first = usdt_provider::Backend::from_simulation(sim.clone());
    let second = usdt_provider::Backend::from_simulation(sim.clone());
    sim.attach_tracer("");

    let definition = usdt_provider::ProbeDefinition::new(&first, "alpha", "start", &["int"]).unwrap();
    let mut provider = usdt_provider::Provider::new(&second, "pb", "m").unwrap();
    provider.add_probe(definition).unwrap();
    provider.enable().unwrap();

    provider.probe("alpha", "start").unwrap().fire(&[ArgValue::Int(7)]);
    assert_eq!(sim.last_event().unwrap().description(), "pb:m:alpha:start");
}
