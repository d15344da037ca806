//! Ready-made runs: a single agent, and an agent inside a lattice.

use inclusion_compose::{ComposeError, CompositeFactory, Hierarchy};
use inclusion_core::{tree, AbsolutePath, Config, Tree, TreeExt, Value};
use inclusion_engine::{compose_experiment, run_experiment, EngineConfig, ExperimentError};

pub use inclusion_engine::ExperimentRun;

use crate::inclusion_body_growth::{InclusionBodyGrowth, GROWTH_RATE, INCLUSION_PROCESS};
use crate::lattice::{make_lattice_config, Lattice};

/// One agent `"0"` at `/agents/0`, damage rate 1e-4, growth rate 1e-3,
/// starting from `initial_biomass`.
pub fn run_inclusion_body(
    total_time: f64,
    initial_biomass: f64,
) -> Result<ExperimentRun, ExperimentError> {
    let agent_id = "0";
    let config = Config::new()
        .with("agent_id", agent_id)
        .with(INCLUSION_PROCESS, tree([("damage_rate", Value::from(1e-4))]))
        .with(GROWTH_RATE, tree([("growth_rate", Value::from(1e-3))]));
    let factory = CompositeFactory::new(InclusionBodyGrowth, &config);

    let at = AbsolutePath::new(["agents", agent_id]);
    let composite = factory.generate(&at)?;

    let mut agent_state = factory.initial_state(&Config::new())?;
    agent_state.insert(
        "molecules".into(),
        Value::Map(tree([("biomass", Value::from(initial_biomass))])),
    );
    let mut state = Tree::new();
    state
        .place(&at, Value::Map(agent_state))
        .map_err(ComposeError::from)?;

    run_experiment(EngineConfig::new(composite, state), total_time)
}

/// Agent `"1"` inside a 30 x 30 lattice, with more aggregate at the front
/// pole than the back.
pub fn run_lattice_experiment(time_total: f64) -> Result<ExperimentRun, ExperimentError> {
    let agent_id = "1";
    let lattice = CompositeFactory::new(Lattice, &make_lattice_config(1e-4, [30.0, 30.0]));
    let agent = CompositeFactory::new(
        InclusionBodyGrowth,
        &Config::new()
            .with("agent_id", agent_id)
            .with(INCLUSION_PROCESS, tree([("damage_rate", Value::from(5e-5))])),
    );

    let agent_state = agent.initial_state(
        &Config::new()
            .with("front", tree([("aggregate", Value::from(200.0))]))
            .with("back", tree([("aggregate", Value::from(10.0))])),
    )?;
    let initial_state = tree([(
        "agents",
        Value::Map(tree([(agent_id, Value::Map(agent_state))])),
    )]);

    let hierarchy = Hierarchy::leaf(lattice).with_child(
        "agents",
        Hierarchy::subtree().with_child(agent_id, Hierarchy::leaf(agent)),
    );
    run_experiment(compose_experiment(&hierarchy, initial_state)?, time_total)
}
