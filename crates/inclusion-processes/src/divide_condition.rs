//! Threshold trigger for division.

use inclusion_compose::schema::schema;
use inclusion_compose::{PortSchema, Process, Schema, StepContext, Update, Variable};
use inclusion_core::{Config, ConfigError, ProcessError};

/// Default trigger value.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Writes `divide = variable >= threshold` every step.
///
/// Runs as a deriver so the flag always reflects the committed state.
#[derive(Clone, Debug)]
pub struct DivideCondition {
    threshold: f64,
}

impl DivideCondition {
    /// Read `threshold`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold: config.f64_or("threshold", DEFAULT_THRESHOLD)?,
        })
    }

    /// The trigger value.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Process for DivideCondition {
    fn name(&self) -> &str {
        "DivideCondition"
    }

    fn ports_schema(&self) -> Schema {
        schema([
            ("variable", PortSchema::Leaf(Variable::new(0.0).split())),
            (
                "divide",
                PortSchema::Leaf(Variable::new(false).set().zero()),
            ),
        ])
    }

    fn is_deriver(&self) -> bool {
        true
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let value = ctx.leaf_f64("variable")?;
        Ok(Update::new().with("divide", value >= self.threshold))
    }
}
