//! Composer, factory, and hierarchy behaviour against fixture composers.

use inclusion_compose::{ComposeError, CompositeFactory, Hierarchy, INITIAL_STATE_CONFIG};
use inclusion_core::{tree, AbsolutePath, Config, Path, TreeExt, Value};
use inclusion_test_utils::fixtures::PairComposer;

fn pair(config: Config) -> CompositeFactory {
    CompositeFactory::new(PairComposer, &config)
}

#[test]
fn every_port_has_exactly_one_topology_entry() {
    let f = pair(Config::new());
    let processes = f.generate_processes().unwrap();
    let topology = f.generate_topology().unwrap();
    assert_eq!(
        processes.keys().collect::<Vec<_>>(),
        topology.keys().collect::<Vec<_>>()
    );
    for (name, process) in &processes {
        let wiring = &topology[name];
        for port in process.ports_schema().keys() {
            assert!(wiring.contains_key(port), "{name} port {port} unwired");
        }
        assert_eq!(wiring.len(), process.ports_schema().len());
    }
}

#[test]
fn generate_is_deterministic() {
    let f = pair(Config::new().with("value", 2.0));
    let a = f.generate(&AbsolutePath::root()).unwrap();
    let b = f.generate(&AbsolutePath::root()).unwrap();
    assert_eq!(a.signature(), b.signature());
    assert_eq!(a.len(), 2);
}

#[test]
fn generate_at_path_prefixes_every_port() {
    let at = AbsolutePath::new(["agents", "7"]);
    let c = pair(Config::new()).generate(&at).unwrap();
    let counter = at.child("counter");
    assert_eq!(
        c.port_path(&counter, "count").unwrap(),
        AbsolutePath::new(["agents", "7", "count"])
    );
}

#[test]
fn wrongly_typed_path_config_is_reported() {
    let f = pair(Config::new().with("counter_path", 3.0));
    let err = f.generate(&AbsolutePath::root()).unwrap_err();
    assert!(matches!(err, ComposeError::Config(_)), "{err}");
}

#[test]
fn escaping_paths_are_allowed_at_root_but_not_below() {
    let f = pair(Config::new().with("const_path", Path::new(["..", "level"])));
    assert!(f.generate(&AbsolutePath::root()).is_ok());
    assert!(f.generate(&AbsolutePath::new(["env"])).is_ok());

    let f = pair(Config::new().with("const_path", Path::new(["..", "..", "level"])));
    let err = f.generate(&AbsolutePath::new(["env"])).unwrap_err();
    assert!(matches!(err, ComposeError::PathEscape { ref port, .. } if port == "out"));
}

#[test]
fn shallow_override_of_initial_state_config() {
    let f = pair(Config::new().with(
        INITIAL_STATE_CONFIG,
        tree([("counter", Value::Map(tree([("x", 1.0_f64.into()), ("y", 2.0_f64.into())])))]),
    ));
    let overridden = f.with_overrides(&Config::new().with(
        INITIAL_STATE_CONFIG,
        tree([("counter", Value::Map(tree([("y", 3.0_f64.into())])))]),
    ));
    let section = overridden
        .config()
        .section(INITIAL_STATE_CONFIG)
        .unwrap()
        .section("counter")
        .unwrap();
    assert_eq!(section.len(), 1);
    assert_eq!(section.f64("y").unwrap(), 3.0);
}

#[test]
fn initial_state_overlays_unknown_keys() {
    let f = pair(Config::new());
    let state = f
        .initial_state(&Config::new().with("extra", tree([("a", 1.0_f64.into())])))
        .unwrap();
    assert_eq!(state["count"], Value::from(0.0));
    assert_eq!(state["level"], Value::from(0.0));
    assert_eq!(
        state.lookup(&AbsolutePath::new(["extra", "a"])),
        Some(&Value::from(1.0))
    );
}

#[test]
fn merge_collision_leaves_target_untouched() {
    let mut root = pair(Config::new()).generate(&AbsolutePath::root()).unwrap();
    let err = root
        .merge(
            pair(Config::new()).generate(&AbsolutePath::root()).unwrap(),
            &AbsolutePath::root(),
        )
        .unwrap_err();
    assert!(matches!(err, ComposeError::NameCollision { .. }));
    assert_eq!(root.len(), 2);
}

#[test]
fn hierarchy_matches_manual_merge() {
    let env = pair(Config::new().with("counter_path", Path::new(["agents", "count"])));
    let agent = pair(Config::new().with("const_path", Path::new(["..", "..", "level"])));

    let hierarchy = Hierarchy::leaf(env.clone()).with_child(
        "agents",
        Hierarchy::subtree().with_child("1", Hierarchy::leaf(agent.clone())),
    );
    let composed = hierarchy.compose().unwrap();

    let mut manual = env.generate(&AbsolutePath::root()).unwrap();
    manual
        .merge(
            agent.generate(&AbsolutePath::root()).unwrap(),
            &AbsolutePath::new(["agents", "1"]),
        )
        .unwrap();

    assert_eq!(composed.signature(), manual.signature());
    assert_eq!(
        composed.resolved_topology().unwrap(),
        manual.resolved_topology().unwrap()
    );
    assert_eq!(
        composed
            .port_path(&AbsolutePath::new(["agents", "1", "const"]), "out")
            .unwrap(),
        AbsolutePath::new(["level"])
    );
}

#[test]
fn hierarchy_reports_escape() {
    let agent = pair(Config::new().with("const_path", Path::new(["..", "..", "level"])));
    let err = Hierarchy::subtree()
        .with_child("a", Hierarchy::leaf(agent))
        .compose()
        .unwrap_err();
    assert!(matches!(err, ComposeError::PathEscape { .. }));
}

mod prefixing {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn generated_ports_live_under_the_prefix(
            segments in proptest::collection::vec("[a-z0-9]{1,4}", 1..4),
        ) {
            let at = AbsolutePath::new(segments.iter().map(String::as_str));
            let f = pair(Config::new());
            let placed = f.generate(&at).unwrap();
            let rooted = f.generate(&AbsolutePath::root()).unwrap();

            for (location, ports) in rooted.resolved_topology().unwrap() {
                let moved = at.join(&location);
                prop_assert!(placed.contains(&moved));
                for (port, path) in ports {
                    prop_assert_eq!(placed.port_path(&moved, &port).unwrap(), at.join(&path));
                }
            }
        }
    }
}
