//! Division applied by the engine: timing, state splitting, staleness,
//! collisions, and rollback.

use inclusion_compose::topology::wiring;
use std::sync::atomic::{AtomicUsize, Ordering};

use inclusion_compose::schema::schema;
use inclusion_compose::{
    ComposeContext, ComposeError, Composer, Composite, CompositeFactory, PortSchema, Process,
    Processes, Schema, StepContext, Topology, Update, Variable,
};
use inclusion_core::{tree, AbsolutePath, Config, Path, ProcessError, Tree, TreeExt, Value};
use inclusion_engine::{Engine, EngineConfig, StepError};
use inclusion_processes::{DivideCondition, GrowthRate, MetaDivision};

/// Growth, a threshold condition, and a division unit.
struct Cell;

impl Composer for Cell {
    fn name(&self) -> &str {
        "cell"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("growth_rate", tree([("growth_rate", Value::from(0.1))]))
            .with("divide_condition", tree([("threshold", Value::from(110.0))]))
    }

    fn generate_processes(&self, ctx: &ComposeContext<'_>) -> Result<Processes, ComposeError> {
        let config = ctx.config();
        let mut out = Processes::new();
        out.insert(
            "growth_rate".into(),
            Box::new(GrowthRate::from_config(&config.section("growth_rate")?)?),
        );
        out.insert(
            "divide_condition".into(),
            Box::new(DivideCondition::from_config(
                &config.section("divide_condition")?,
            )?),
        );
        out.insert(
            "division".into(),
            Box::new(MetaDivision::new(config, ctx.factory().clone())?),
        );
        Ok(out)
    }

    fn generate_topology(&self, _config: &Config) -> Result<Topology, ComposeError> {
        let mut t = Topology::new();
        t.insert(
            "growth_rate".into(),
            wiring([
                ("variables", Path::new(["molecules"])),
                ("rates", Path::new(["rates"])),
            ]),
        );
        t.insert(
            "divide_condition".into(),
            wiring([
                ("variable", Path::new(["molecules", "biomass"])),
                ("divide", Path::new(["boundary", "divide"])),
            ]),
        );
        t.insert(
            "division".into(),
            wiring([
                ("global", Path::new(["boundary"])),
                ("agents", Path::new(["..", "..", "agents"])),
            ]),
        );
        Ok(t)
    }
}

fn agent(id: &str) -> Composite {
    CompositeFactory::new(Cell, &Config::new().with("agent_id", id))
        .generate(&AbsolutePath::root())
        .unwrap()
}

fn world(agent_id: &str, at: &str, biomass: f64, extra: Tree) -> Engine {
    let mut composite = Composite::new();
    composite
        .merge(agent(agent_id), &AbsolutePath::new(["agents", at]))
        .unwrap();
    let mut state = Tree::new();
    state
        .place(
            &AbsolutePath::new(["agents", at, "molecules", "biomass"]),
            biomass.into(),
        )
        .unwrap();
    state.merge_deep(extra);
    Engine::new(EngineConfig::new(composite, state)).unwrap()
}

fn biomass(e: &Engine, id: &str) -> f64 {
    e.state()
        .lookup(&AbsolutePath::new(["agents", id, "molecules", "biomass"]))
        .and_then(Value::as_f64)
        .unwrap()
}

fn divide_flag(e: &Engine, id: &str) -> bool {
    e.state()
        .lookup(&AbsolutePath::new(["agents", id, "boundary", "divide"]))
        .and_then(Value::as_bool)
        .unwrap()
}

#[test]
fn divides_one_step_after_threshold() {
    let mut e = world("1", "1", 100.0, Tree::new());
    assert!(!divide_flag(&e, "1"));

    // 100 -> 110: condition fires, nothing divides yet.
    e.step().unwrap();
    assert!(divide_flag(&e, "1"));
    assert_eq!(e.children(&AbsolutePath::new(["agents"])), vec!["1"]);

    // The division unit sees the flag and the mother is replaced.
    let report = e.step().unwrap();
    assert_eq!(report.divisions.len(), 1);
    assert_eq!(
        e.children(&AbsolutePath::new(["agents"])),
        vec!["10", "11"]
    );
    assert_eq!(report.metrics.agents_added, 2);
    assert_eq!(report.metrics.agents_removed, 1);

    // 110 grew to 121 during the step, then split.
    assert!((biomass(&e, "10") - 60.5).abs() < 1e-9);
    assert!((biomass(&e, "11") - 60.5).abs() < 1e-9);
    assert!(!divide_flag(&e, "10"));
    assert!(!divide_flag(&e, "11"));

    // Daughters carry structurally identical process sets.
    let composite = e.composite();
    assert_eq!(composite.len(), 6);
    for id in ["10", "11"] {
        let node = AbsolutePath::new(["agents", id]);
        let names: Vec<_> = composite
            .locations()
            .filter_map(|l| l.strip_prefix(&node))
            .map(|l| l.to_string())
            .collect();
        assert_eq!(names, ["/growth_rate", "/divide_condition", "/division"]);
        assert_eq!(
            composite
                .port_path(&node.child("division"), "global")
                .unwrap(),
            node.child("boundary")
        );
    }
    assert!(!composite
        .locations()
        .any(|l| l.starts_with(&AbsolutePath::new(["agents", "1"]))));

    let event = &e.divisions()[0];
    assert_eq!(event.mother, AbsolutePath::new(["agents", "1"]));
    assert_eq!(event.time, 2.0);
}

#[test]
fn daughters_keep_dividing_independently() {
    let mut e = world("1", "1", 100.0, Tree::new());
    e.update(20.0).unwrap();
    let agents = e.children(&AbsolutePath::new(["agents"]));
    assert!(agents.len() > 2, "{agents:?}");
    for id in &agents {
        assert!(biomass(&e, id) < 110.0 * 1.1 + 1e-9);
    }
}

#[test]
fn stale_agent_id_is_reported_and_rolled_back() {
    let mut e = world("9", "1", 200.0, Tree::new());
    let before = e.state().clone();
    let err = e.step().unwrap_err();
    assert_eq!(
        err,
        StepError::Compose(ComposeError::StaleDivisionConfig {
            captured: "9".into(),
            actual: "1".into()
        })
    );
    assert_eq!(e.state(), &before);
    assert_eq!(e.composite().len(), 3);
}

#[test]
fn collision_with_existing_agent_leaves_everything_untouched() {
    let occupied = tree([(
        "agents",
        Value::Map(tree([(
            "10",
            Value::Map(tree([("label", Value::from("squatter"))])),
        )])),
    )]);
    let mut e = world("1", "1", 200.0, occupied);
    let before = e.state().clone();
    let err = e.step().unwrap_err();
    assert_eq!(
        err,
        StepError::Compose(ComposeError::NameCollision {
            location: AbsolutePath::new(["agents", "10"])
        })
    );
    assert_eq!(e.state(), &before);
    assert_eq!(e.composite().len(), 3);
    assert!(e.divisions().is_empty());
}

#[test]
fn schema_default_fills_missing_state() {
    let e = world("1", "1", 50.0, Tree::new());
    let rates = e
        .state()
        .lookup(&AbsolutePath::new(["agents", "1", "rates", "growth_rate"]))
        .and_then(Value::as_f64);
    assert_eq!(rates, Some(0.1));
    assert!(!divide_flag(&e, "1"));
}

/// Deriver that fails on exactly one call, counting from zero.
struct FlakyDeriver {
    fail_on: usize,
    calls: AtomicUsize,
}

impl Process for FlakyDeriver {
    fn name(&self) -> &str {
        "flaky"
    }

    fn ports_schema(&self) -> Schema {
        schema([("out", PortSchema::Leaf(Variable::new(0.0).set()))])
    }

    fn is_deriver(&self) -> bool {
        true
    }

    fn next_update(&self, _ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        if self.calls.fetch_add(1, Ordering::Relaxed) == self.fail_on {
            return Err(ProcessError::ExecutionFailed {
                reason: "transient".into(),
            });
        }
        Ok(Update::new().with("out", 1.0))
    }
}

#[test]
fn division_rolled_back_by_a_later_failure_fires_again() {
    let mut flaky = Processes::new();
    flaky.insert(
        "flaky".into(),
        Box::new(FlakyDeriver {
            // Construction, step 1, then the division step.
            fail_on: 2,
            calls: AtomicUsize::new(0),
        }),
    );
    let mut topology = Topology::new();
    topology.insert("flaky".into(), wiring([("out", Path::new(["flaky"]))]));

    let mut composite = Composite::from_parts(flaky, topology).unwrap();
    composite
        .merge(agent("1"), &AbsolutePath::new(["agents", "1"]))
        .unwrap();
    let mut state = Tree::new();
    state
        .place(
            &AbsolutePath::new(["agents", "1", "molecules", "biomass"]),
            Value::from(100.0),
        )
        .unwrap();
    let mut e = Engine::new(EngineConfig::new(composite, state)).unwrap();

    e.step().unwrap();
    assert!(divide_flag(&e, "1"));
    let before = e.state().clone();

    let err = e.step().unwrap_err();
    assert!(matches!(err, StepError::ProcessFailed { .. }), "{err}");
    assert_eq!(e.state(), &before);
    assert_eq!(e.children(&AbsolutePath::new(["agents"])), vec!["1"]);
    assert!(e.divisions().is_empty());

    e.step().unwrap();
    assert_eq!(
        e.children(&AbsolutePath::new(["agents"])),
        vec!["10", "11"]
    );
    assert_eq!(e.divisions().len(), 1);
}
