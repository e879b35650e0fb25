/*!
 * Fire Path Tests
 * Argument marshaling and emission as observed by a simulated tracer
 */

use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use usdt_provider::{
    ArgValue, CoercionPolicy, FireStats, FiredArg, FiredEvent, Provider, SimulationBackend,
    UsdtConfig, UsdtError, UsdtRegistry, ARG_MAX,
};

fn enabled_provider(
    policy: CoercionPolicy,
    probes: &[(&str, &str, &[&str])],
) -> (UsdtRegistry, SimulationBackend, Provider) {
    let registry =
        UsdtRegistry::new(UsdtConfig::simulation().with_coercion(policy)).unwrap();
    let sim = registry.simulation_backend().unwrap().clone();
    let mut provider = registry.create_provider("myapp", "core").unwrap();
    for &(function, name, args) in probes {
        provider
            .add_probe(registry.create_probe(function, name, args).unwrap())
            .unwrap();
    }
    provider.enable().unwrap();
    (registry, sim, provider)
}

#[test]
fn test_do_work_scenario() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("doWork", "start", &["int"])]);
    sim.attach_tracer("myapp:core:doWork:start");

    provider.probe("doWork", "start").unwrap().fire(&[42.into()]);

    let events = sim.recent_events(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].description(), "myapp:core:doWork:start");
    assert_eq!(events[0].args, vec![FiredArg::Int(42)]);
}

#[test]
fn test_too_many_declared_tags() {
    let registry = UsdtRegistry::simulation();
    let tags = vec!["int"; 33];
    assert_eq!(
        registry.create_probe("f", "g", &tags).unwrap_err(),
        UsdtError::ArgumentLimitExceeded { count: 33, max: ARG_MAX }
    );
    assert_eq!(registry.simulation_backend().unwrap().pending_definitions(), 0);
}

#[test]
fn test_round_trip_integers_in_order() {
    let tags = vec!["int"; ARG_MAX];
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "all", tags.as_slice())]);
    sim.attach_tracer("");

    let args: Vec<ArgValue> = (0..ARG_MAX as i64).map(ArgValue::from).collect();
    provider.probe("f", "all").unwrap().fire(&args);

    let expected: Vec<FiredArg> = (0..ARG_MAX as i64).map(FiredArg::Int).collect();
    assert_eq!(sim.last_event().unwrap().args, expected);
}

#[test]
fn test_strings_and_integers_mixed() {
    let (_registry, sim, provider) = enabled_provider(
        CoercionPolicy::Strict,
        &[("query", "start", &["char *", "int", "char *"])],
    );
    sim.attach_tracer("");

    provider
        .probe("query", "start")
        .unwrap()
        .fire(&["SELECT 1".into(), 7.into(), "".into()]);

    assert_eq!(
        sim.last_event().unwrap().args,
        vec![
            FiredArg::Str("SELECT 1".into()),
            FiredArg::Int(7),
            FiredArg::Str(String::new()),
        ]
    );
}

#[test]
fn test_zero_argument_probe() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "tick", &[])]);
    sim.attach_tracer("");

    let probe = provider.probe("f", "tick").unwrap();
    probe.fire(&[]);

    assert!(sim.last_event().unwrap().args.is_empty());
    assert_eq!(probe.stats(), FireStats { fired: 1, skipped: 0, dropped: 0 });
}

#[test]
fn test_fire_without_tracer_is_silent() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "g", &["int"])]);
    let probe = provider.probe("f", "g").unwrap();

    probe.fire(&[1.into()]);
    assert!(sim.last_event().is_none());
    assert_eq!(probe.stats().skipped, 1);
}

#[test]
fn test_strict_mismatch_counts_as_dropped() {
    let (registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "g", &["int"])]);
    sim.attach_tracer("");
    let probe = provider.probe("f", "g").unwrap();

    probe.fire(&["nope".into()]);
    probe.fire(&[1.into(), 2.into()]);
    probe.fire(&[3.into()]);

    assert_eq!(probe.stats(), FireStats { fired: 1, skipped: 0, dropped: 2 });
    assert_eq!(registry.stats().total(), 3);
    assert_eq!(sim.events().total_events(), 1);
}

#[test]
fn test_permissive_mirrors_runtime_dispatch() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Permissive, &[("f", "g", &["int", "int"])]);
    sim.attach_tracer("");

    provider
        .probe("f", "g")
        .unwrap()
        .fire(&[ArgValue::Float(2.5), ArgValue::Int(1 << 40)]);

    // Neither value is an int32, so both travel as strings
    assert_eq!(
        sim.last_event().unwrap().args,
        vec![
            FiredArg::Str("2.5".into()),
            FiredArg::Str("1099511627776".into()),
        ]
    );
}

#[test]
fn test_oversized_fire_never_reaches_tracer() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Permissive, &[("f", "g", &[])]);
    sim.attach_tracer("");
    let probe = provider.probe("f", "g").unwrap();

    let args: Vec<ArgValue> = (0..(ARG_MAX + 8) as i64).map(ArgValue::from).collect();
    probe.fire(&args);

    assert!(sim.last_event().is_none());
    assert_eq!(probe.stats().dropped, 1);
}

#[test]
fn test_fire_with_skips_argument_building() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "g", &["char *"])]);
    let probe = provider.probe("f", "g").unwrap();

    probe.fire_with(|| panic!("arguments built without a tracer"));
    assert_eq!(probe.stats().skipped, 1);

    sim.attach_tracer("f:g");
    probe.fire_with(|| vec!["payload".into()]);
    assert_eq!(
        sim.last_event().unwrap().args,
        vec![FiredArg::Str("payload".into())]
    );
}

#[test]
fn test_subscriber_sees_each_event() {
    let (_registry, sim, provider) =
        enabled_provider(CoercionPolicy::Strict, &[("f", "g", &["int"])]);
    let seen: Arc<Mutex<Vec<FiredEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    sim.attach_tracer_with(
        "myapp:core:f:g",
        Box::new(move |event: &FiredEvent| sink.lock().unwrap().push(event.clone())),
    );

    let probe = provider.probe("f", "g").unwrap();
    for i in 0..3 {
        probe.fire(&[ArgValue::Int(i)]);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].args, vec![FiredArg::Int(2)]);
}
