//! Protein damage and polar aggregation.
//!
//! Each step a fraction of biomass is damaged and deposited as aggregate at
//! the two cell poles. The total inclusion body is the sum of both poles.

use inclusion_compose::schema::schema;
use inclusion_compose::{PortSchema, Process, Schema, StepContext, Update, Variable};
use inclusion_core::{tree, Config, ConfigError, ProcessError, Tree, Value};

/// Default fraction of biomass damaged per unit time.
pub const DEFAULT_DAMAGE_RATE: f64 = 1e-6;
/// Default share of new aggregate deposited at the front pole.
pub const DEFAULT_FRONT_FRACTION: f64 = 0.5;

/// Damage/aggregation process.
///
/// Ports:
/// - `front`, `back`: branches holding `aggregate` (accumulate, split).
/// - `inclusion_body`: total aggregate (set, split).
/// - `molecules`: branch holding `biomass`.
#[derive(Clone, Debug)]
pub struct InclusionBody {
    damage_rate: f64,
    front_fraction: f64,
}

impl InclusionBody {
    /// Read `damage_rate` and `front_fraction`, falling back to defaults.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let damage_rate = config.f64_or("damage_rate", DEFAULT_DAMAGE_RATE)?;
        let front_fraction = config.f64_or("front_fraction", DEFAULT_FRONT_FRACTION)?;
        if !(0.0..=1.0).contains(&front_fraction) {
            return Err(ConfigError::Invalid {
                key: "front_fraction".into(),
                reason: format!("must be within [0, 1], got {front_fraction}"),
            });
        }
        Ok(Self {
            damage_rate,
            front_fraction,
        })
    }

    /// Damage rate in use.
    pub fn damage_rate(&self) -> f64 {
        self.damage_rate
    }
}

impl Default for InclusionBody {
    fn default() -> Self {
        Self {
            damage_rate: DEFAULT_DAMAGE_RATE,
            front_fraction: DEFAULT_FRONT_FRACTION,
        }
    }
}

fn aggregate_port() -> PortSchema {
    PortSchema::branch([("aggregate", Variable::new(0.0).split())])
}

impl Process for InclusionBody {
    fn name(&self) -> &str {
        "InclusionBody"
    }

    fn ports_schema(&self) -> Schema {
        schema([
            ("front", aggregate_port()),
            ("back", aggregate_port()),
            (
                "inclusion_body",
                PortSchema::Leaf(Variable::new(0.0).set().split()),
            ),
            (
                "molecules",
                PortSchema::branch([("biomass", Variable::new(0.0).split())]),
            ),
        ])
    }

    /// `initial_mass` of aggregate, split evenly between the poles.
    fn initial_state(&self, config: &Config) -> Result<Tree, ConfigError> {
        let mass = config.f64_or("initial_mass", 0.0)?;
        let pole = |m: f64| Value::Map(tree([("aggregate", Value::from(m))]));
        Ok(tree([
            ("front", pole(mass / 2.0)),
            ("back", pole(mass / 2.0)),
            ("inclusion_body", Value::from(mass)),
        ]))
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let biomass = ctx.float("molecules", "biomass")?;
        let front = ctx.float("front", "aggregate")?;
        let back = ctx.float("back", "aggregate")?;

        let damaged = (self.damage_rate * biomass * ctx.dt()).max(0.0);
        let to_front = self.front_fraction * damaged;
        let to_back = damaged - to_front;

        Ok(Update::new()
            .with("front", tree([("aggregate", Value::from(to_front))]))
            .with("back", tree([("aggregate", Value::from(to_back))]))
            .with("inclusion_body", front + back + damaged))
    }
}
