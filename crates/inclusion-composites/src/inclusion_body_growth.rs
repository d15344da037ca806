//! The inclusion-body growth agent.
//!
//! Five units per agent: damage/aggregation, growth, shape, the division
//! condition, and the division unit. Division re-instantiates the agent
//! from the factory that generated it.

use inclusion_compose::topology::wiring;
use inclusion_compose::{
    ComposeContext, ComposeError, Composer, Processes, Topology, INITIAL_STATE_CONFIG,
};
use inclusion_core::{tree, Config, Path, Value};
use inclusion_processes::{DivideCondition, EcoliShape, GrowthRate, InclusionBody, MetaDivision};

/// Composer name.
pub const NAME: &str = "inclusion_body_growth";

/// Damage and polar aggregation.
pub const INCLUSION_PROCESS: &str = "inclusion_process";
/// Biomass growth.
pub const GROWTH_RATE: &str = "growth_rate";
/// Capsule geometry.
pub const GLOBALS_DERIVER: &str = "globals_deriver";
/// Biomass threshold.
pub const DIVIDE_CONDITION: &str = "divide_condition";
/// Division unit.
pub const DIVISION: &str = "division";

/// Composer for one inclusion-body agent.
///
/// Recognized config keys (all optional except `agent_id`, which the
/// division unit requires): one section per process name,
/// `boundary_path`, `agents_path`, `daughter_path`, and
/// `initial_state_config`.
#[derive(Clone, Copy, Debug, Default)]
pub struct InclusionBodyGrowth;

impl Composer for InclusionBodyGrowth {
    fn name(&self) -> &str {
        NAME
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with(INCLUSION_PROCESS, Value::map())
            .with(
                GROWTH_RATE,
                tree([("variables", Value::List(vec!["biomass".into()]))]),
            )
            .with(DIVIDE_CONDITION, tree([("threshold", Value::from(3000.0))]))
            .with(DIVISION, Value::map())
            .with("boundary_path", Path::new(["boundary"]))
            .with("agents_path", Path::new(["..", "..", "agents"]))
            .with("daughter_path", Path::here())
            .with(
                INITIAL_STATE_CONFIG,
                tree([
                    (
                        INCLUSION_PROCESS,
                        Value::Map(tree([("initial_mass", Value::from(10.0))])),
                    ),
                    (
                        GROWTH_RATE,
                        Value::Map(tree([("initial_mass", Value::from(1200.0))])),
                    ),
                ]),
            )
    }

    fn generate_processes(&self, ctx: &ComposeContext<'_>) -> Result<Processes, ComposeError> {
        let config = ctx.config();
        let division = config
            .section(DIVISION)?
            .with("agent_id", config.str("agent_id")?)
            .with("daughter_path", config.path_or("daughter_path", Path::here())?);

        let mut out = Processes::new();
        out.insert(
            INCLUSION_PROCESS.into(),
            Box::new(InclusionBody::from_config(&config.section(INCLUSION_PROCESS)?)?),
        );
        out.insert(
            GROWTH_RATE.into(),
            Box::new(GrowthRate::from_config(&config.section(GROWTH_RATE)?)?),
        );
        out.insert(GLOBALS_DERIVER.into(), Box::new(EcoliShape));
        out.insert(
            DIVIDE_CONDITION.into(),
            Box::new(DivideCondition::from_config(&config.section(DIVIDE_CONDITION)?)?),
        );
        out.insert(
            DIVISION.into(),
            Box::new(MetaDivision::new(&division, ctx.factory().clone())?),
        );
        Ok(out)
    }

    fn generate_topology(&self, config: &Config) -> Result<Topology, ComposeError> {
        let boundary = config.path_or("boundary_path", Path::new(["boundary"]))?;
        let agents = config.path_or("agents_path", Path::new(["..", "..", "agents"]))?;

        let mut out = Topology::new();
        out.insert(
            INCLUSION_PROCESS.into(),
            wiring([
                ("front", Path::new(["front"])),
                ("back", Path::new(["back"])),
                ("inclusion_body", Path::new(["inclusion_body"])),
                ("molecules", Path::new(["molecules"])),
            ]),
        );
        out.insert(
            GROWTH_RATE.into(),
            wiring([
                ("variables", Path::new(["molecules"])),
                ("rates", Path::new(["rates"])),
            ]),
        );
        out.insert(GLOBALS_DERIVER.into(), wiring([("global", boundary.clone())]));
        out.insert(
            DIVIDE_CONDITION.into(),
            wiring([
                ("variable", Path::new(["molecules", "biomass"])),
                ("divide", boundary.child("divide")),
            ]),
        );
        out.insert(
            DIVISION.into(),
            wiring([("global", boundary), ("agents", agents)]),
        );
        Ok(out)
    }
}
