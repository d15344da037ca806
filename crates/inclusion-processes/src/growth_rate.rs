//! Exponential growth of named variables.

use indexmap::IndexMap;
use inclusion_compose::schema::schema;
use inclusion_compose::{PortSchema, Process, Schema, StepContext, Update, Variable};
use inclusion_core::{tree, Config, ConfigError, ProcessError, Tree, Value};

/// Default per-unit-time growth rate.
pub const DEFAULT_GROWTH_RATE: f64 = 0.0005;
/// Default initial value for each growing variable.
pub const DEFAULT_INITIAL_MASS: f64 = 1000.0;

/// `v += rate · v · dt` for every configured variable.
///
/// Ports: `variables` (one accumulating, splitting float per name) and
/// `rates` (`growth_rate`, set each step).
#[derive(Clone, Debug)]
pub struct GrowthRate {
    rate: f64,
    variables: Vec<String>,
}

impl GrowthRate {
    /// Read `growth_rate` and `variables`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            rate: config.f64_or("growth_rate", DEFAULT_GROWTH_RATE)?,
            variables: config.strings_or("variables", &["biomass"])?,
        })
    }

    /// Growth rate in use.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Process for GrowthRate {
    fn name(&self) -> &str {
        "GrowthRate"
    }

    fn ports_schema(&self) -> Schema {
        let variables: IndexMap<String, Variable> = self
            .variables
            .iter()
            .map(|v| (v.clone(), Variable::new(0.0).split()))
            .collect();
        schema([
            ("variables", PortSchema::Branch(variables)),
            (
                "rates",
                PortSchema::branch([("growth_rate", Variable::new(self.rate).set())]),
            ),
        ])
    }

    fn initial_state(&self, config: &Config) -> Result<Tree, ConfigError> {
        let mass = config.f64_or("initial_mass", DEFAULT_INITIAL_MASS)?;
        let variables = self
            .variables
            .iter()
            .map(|v| (v.clone(), Value::from(mass)))
            .collect();
        Ok(tree([
            ("variables", Value::Map(variables)),
            (
                "rates",
                Value::Map(tree([("growth_rate", Value::from(self.rate))])),
            ),
        ]))
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let mut deltas = Tree::with_capacity(self.variables.len());
        for name in &self.variables {
            let v = ctx.float("variables", name)?;
            deltas.insert(name.clone(), Value::from(self.rate * v * ctx.dt()));
        }
        Ok(Update::new()
            .with("variables", deltas)
            .with("rates", tree([("growth_rate", Value::from(self.rate))])))
    }
}
