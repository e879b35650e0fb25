/*!
 * Property Tests
 * Identity, ceiling and round-trip properties over generated inputs
 */

use proptest::prelude::*;
use usdt_provider::{ArgValue, FiredArg, UsdtError, UsdtRegistry, ARG_MAX};

fn identifier() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::char::range('a', 'z'), 1..=64)
        .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_provider_identity_round_trips(name in identifier(), module in identifier()) {
        let registry = UsdtRegistry::simulation();
        let provider = registry.create_provider(&name, &module).unwrap();
        prop_assert_eq!(provider.name(), name.as_str());
        prop_assert_eq!(provider.module(), module.as_str());
    }

    #[test]
    fn test_declared_count_ceiling(count in 0usize..=(ARG_MAX * 2)) {
        let registry = UsdtRegistry::simulation();
        let sim = registry.simulation_backend().unwrap().clone();
        let tags = vec!["int"; count];

        match registry.create_probe("f", "g", &tags) {
            Ok(definition) => {
                prop_assert!(count <= ARG_MAX);
                prop_assert_eq!(definition.argc(), count);
            }
            Err(err) => {
                prop_assert!(count > ARG_MAX);
                prop_assert_eq!(err, UsdtError::ArgumentLimitExceeded { count, max: ARG_MAX });
                prop_assert_eq!(sim.pending_definitions(), 0);
            }
        }
    }

    #[test]
    fn test_integer_round_trip(values in proptest::collection::vec(any::<i32>(), 0..=ARG_MAX)) {
        let registry = UsdtRegistry::simulation();
        let sim = registry.simulation_backend().unwrap().clone();
        let tags = vec!["int"; values.len()];

        let mut provider = registry.create_provider("myapp", "core").unwrap();
        provider
            .add_probe(registry.create_probe("f", "g", &tags).unwrap())
            .unwrap();
        provider.enable().unwrap();
        sim.attach_tracer("");

        let args: Vec<ArgValue> = values.iter().copied().map(ArgValue::from).collect();
        provider.probes()[0].fire(&args);

        let expected: Vec<FiredArg> = values.iter().map(|&v| FiredArg::Int(v as i64)).collect();
        prop_assert_eq!(sim.last_event().unwrap().args, expected);
    }

    #[test]
    fn test_never_enabled_before_enable(probes in 1usize..16) {
        let registry = UsdtRegistry::simulation();
        let sim = registry.simulation_backend().unwrap().clone();
        sim.attach_tracer("");

        let mut provider = registry.create_provider("myapp", "core").unwrap();
        for i in 0..probes {
            provider
                .add_probe(registry.create_probe("f", &format!("p{i}"), &["int"]).unwrap())
                .unwrap();
        }
        prop_assert!(provider.probes().iter().all(|p| !p.is_enabled()));
    }
}
