//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the builder-input for constructing an
//! [`Engine`](crate::Engine). [`validate()`](EngineConfig::validate) checks
//! structural invariants at startup: every port path resolves inside the
//! tree and every initial-state leaf lies under some port path.

use std::error::Error;
use std::fmt;

use inclusion_compose::{ComposeError, Composite};
use inclusion_core::{AbsolutePath, ProcessError, StateError, Tree, TreeExt};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating an [`EngineConfig`] or constructing
/// an engine from it.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `timestep` is NaN, infinite, zero, or negative.
    InvalidTimestep {
        /// The invalid value.
        value: f64,
    },
    /// `emit_every` is zero.
    EmitIntervalZero,
    /// The composite's topology is invalid.
    Compose(ComposeError),
    /// The initial state could not be completed with schema defaults.
    State(StateError),
    /// An initial-state leaf is not reachable from any port.
    UnwiredState {
        /// The unreachable leaf.
        path: AbsolutePath,
    },
    /// The initial deriver pass failed.
    InitialDerivers(StepError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestep { value } => {
                write!(f, "timestep must be finite and positive, got {value}")
            }
            Self::EmitIntervalZero => write!(f, "emit_every must be at least 1"),
            Self::Compose(e) => write!(f, "compose: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
            Self::UnwiredState { path } => {
                write!(f, "initial state at {path} is not under any port path")
            }
            Self::InitialDerivers(e) => write!(f, "initial derivers: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Compose(e) => Some(e),
            Self::State(e) => Some(e),
            Self::InitialDerivers(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ComposeError> for ConfigError {
    fn from(e: ComposeError) -> Self {
        Self::Compose(e)
    }
}

impl From<StateError> for ConfigError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

// ── StepError ──────────────────────────────────────────────────────

/// Errors from a single engine step. The step is rolled back.
#[derive(Debug, PartialEq)]
pub enum StepError {
    /// A process returned an error.
    ProcessFailed {
        /// Location of the failing process.
        location: AbsolutePath,
        /// What it reported.
        source: ProcessError,
    },
    /// A process returned an update for a port it does not declare.
    UnknownPort {
        /// Location of the process.
        location: AbsolutePath,
        /// The undeclared port.
        port: String,
    },
    /// A structural update failed.
    Compose(ComposeError),
    /// Writing the update into the state tree failed.
    State(StateError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessFailed { location, source } => {
                write!(f, "process {location} failed: {source}")
            }
            Self::UnknownPort { location, port } => {
                write!(f, "process {location} updated undeclared port '{port}'")
            }
            Self::Compose(e) => write!(f, "structural update: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ProcessFailed { source, .. } => Some(source),
            Self::Compose(e) => Some(e),
            Self::State(e) => Some(e),
            Self::UnknownPort { .. } => None,
        }
    }
}

impl From<ComposeError> for StepError {
    fn from(e: ComposeError) -> Self {
        Self::Compose(e)
    }
}

impl From<StateError> for StepError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for constructing an engine.
pub struct EngineConfig {
    /// Processes and their wiring.
    pub composite: Composite,
    /// Initial state tree. Missing schema variables are filled with
    /// defaults at construction.
    pub initial_state: Tree,
    /// Simulated time per step. Default: 1.0.
    pub timestep: f64,
    /// Record a snapshot every this many steps. Default: 1.
    pub emit_every: u64,
}

impl EngineConfig {
    /// A config with default timestep and emit interval.
    pub fn new(composite: Composite, initial_state: Tree) -> Self {
        Self {
            composite,
            initial_state,
            timestep: 1.0,
            emit_every: 1,
        }
    }

    /// Builder-style timestep.
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Builder-style emit interval.
    pub fn with_emit_every(mut self, emit_every: u64) -> Self {
        self.emit_every = emit_every;
        self
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Timestep must be usable.
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep {
                value: self.timestep,
            });
        }
        // 2. Emit interval >= 1.
        if self.emit_every == 0 {
            return Err(ConfigError::EmitIntervalZero);
        }
        // 3. Every port path resolves inside the tree.
        let resolved = self.composite.resolved_topology()?;
        // 4. Every initial leaf lies under some port path.
        let ports: Vec<&AbsolutePath> = resolved.values().flat_map(|p| p.values()).collect();
        for leaf in self.initial_state.leaf_paths() {
            if !ports.iter().any(|p| leaf.starts_with(p)) {
                return Err(ConfigError::UnwiredState { path: leaf });
            }
        }
        Ok(())
    }
}
