//! Execution context handed to processes each step.

use inclusion_core::{AbsolutePath, ProcessError, StepId, Tree, Value};

/// A process's view of the state tree for one step.
///
/// Holds one value per wired port, taken from the path the topology maps
/// that port to. Branch ports arrive with every declared variable filled in,
/// so the typed accessors only fail on a genuine wiring or shape mismatch.
pub struct StepContext<'a> {
    location: &'a AbsolutePath,
    ports: &'a Tree,
    step: StepId,
    time: f64,
    dt: f64,
}

impl<'a> StepContext<'a> {
    /// Construct a context.
    ///
    /// Typically called by the engine. For testing, build the port tree by
    /// hand or with `inclusion-test-utils`.
    pub fn new(
        location: &'a AbsolutePath,
        ports: &'a Tree,
        step: StepId,
        time: f64,
        dt: f64,
    ) -> Self {
        Self {
            location,
            ports,
            step,
            time,
            dt,
        }
    }

    /// Where the process sits in the tree (its own node, name included).
    pub fn location(&self) -> &AbsolutePath {
        self.location
    }

    /// Raw value at a port.
    pub fn port(&self, port: &str) -> Result<&Value, ProcessError> {
        self.ports.get(port).ok_or_else(|| ProcessError::MissingPort {
            port: port.to_string(),
        })
    }

    /// A branch port.
    pub fn branch(&self, port: &str) -> Result<&Tree, ProcessError> {
        self.port(port)?
            .as_map()
            .ok_or_else(|| bad(port, "expected a branch"))
    }

    /// A float variable inside a branch port.
    pub fn float(&self, port: &str, variable: &str) -> Result<f64, ProcessError> {
        self.branch(port)?
            .get(variable)
            .and_then(Value::as_f64)
            .ok_or_else(|| bad(port, &format!("variable '{variable}' is not a float")))
    }

    /// A bool variable inside a branch port.
    pub fn flag(&self, port: &str, variable: &str) -> Result<bool, ProcessError> {
        self.branch(port)?
            .get(variable)
            .and_then(Value::as_bool)
            .ok_or_else(|| bad(port, &format!("variable '{variable}' is not a bool")))
    }

    /// A leaf port holding a float.
    pub fn leaf_f64(&self, port: &str) -> Result<f64, ProcessError> {
        self.port(port)?
            .as_f64()
            .ok_or_else(|| bad(port, "expected a float"))
    }

    /// Current step.
    pub fn step_id(&self) -> StepId {
        self.step
    }

    /// Simulated time at the start of this step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Timestep length.
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

fn bad(port: &str, reason: &str) -> ProcessError {
    ProcessError::BadPortValue {
        port: port.to_string(),
        reason: reason.to_string(),
    }
}
