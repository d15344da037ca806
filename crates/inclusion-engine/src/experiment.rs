//! Experiment orchestration: composite + initial state + duration in,
//! trajectory out.

use std::error::Error;
use std::fmt;

use inclusion_compose::{ComposeError, Hierarchy};
use inclusion_core::Tree;

use tracing::info;

use crate::config::{ConfigError, EngineConfig, StepError};
use crate::emitter::Trajectory;
use crate::engine::Engine;
use crate::metrics::DivisionEvent;

/// Output of a finished run.
#[derive(Clone, Debug)]
pub struct ExperimentRun {
    /// Every emitted snapshot, starting at t = 0.
    pub trajectory: Trajectory,
    /// Divisions in the order they happened.
    pub divisions: Vec<DivisionEvent>,
}

/// Errors from building or running an experiment.
#[derive(Debug, PartialEq)]
pub enum ExperimentError {
    /// Composition failed.
    Compose(ComposeError),
    /// The engine rejected the configuration.
    Config(ConfigError),
    /// A step failed.
    Step(StepError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compose(e) => write!(f, "compose: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Step(e) => write!(f, "step: {e}"),
        }
    }
}

impl Error for ExperimentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Compose(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Step(e) => Some(e),
        }
    }
}

impl From<ComposeError> for ExperimentError {
    fn from(e: ComposeError) -> Self {
        Self::Compose(e)
    }
}

impl From<ConfigError> for ExperimentError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StepError> for ExperimentError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}

/// Compose `hierarchy` and pair it with `initial_state`.
pub fn compose_experiment(hierarchy: &Hierarchy, initial_state: Tree) -> Result<EngineConfig, ComposeError> {
    Ok(EngineConfig::new(hierarchy.compose()?, initial_state))
}

/// Run `config` for `duration` and return everything emitted.
pub fn run_experiment(config: EngineConfig, duration: f64) -> Result<ExperimentRun, ExperimentError> {
    let mut engine = Engine::new(config)?;
    engine.update(duration)?;
    let divisions = engine.divisions().to_vec();
    info!(
        time = engine.time(),
        divisions = divisions.len(),
        "experiment finished"
    );
    Ok(ExperimentRun {
        trajectory: engine.into_trajectory(),
        divisions,
    })
}
