//! Composition errors.
//!
//! Everything here is structural: raised while generating, merging, or
//! re-wiring composites, and never retried.

use std::error::Error;
use std::fmt;

use inclusion_core::{AbsolutePath, ConfigError, PathError, StateError};

/// Errors from composing processes and topologies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposeError {
    /// A process declares a port that has no topology entry.
    MissingPortPath {
        /// Process name within its composer.
        process: String,
        /// The unwired port.
        port: String,
    },
    /// A topology entry names a port the process does not declare.
    UndeclaredPort {
        /// Process name within its composer.
        process: String,
        /// The extra port.
        port: String,
    },
    /// The process and topology maps have different keys.
    TopologyMismatch {
        /// The process present on one side only.
        process: String,
    },
    /// Two processes would occupy the same location.
    NameCollision {
        /// The contested location.
        location: AbsolutePath,
    },
    /// A port path climbs above the tree root once attached.
    PathEscape {
        /// Location of the process owning the port.
        process: AbsolutePath,
        /// The port whose path escapes.
        port: String,
        /// The resolution failure.
        source: PathError,
    },
    /// No process exists at the given location.
    UnknownProcess {
        /// The location that was looked up.
        location: AbsolutePath,
    },
    /// A division unit's captured agent id disagrees with the agent it
    /// actually lives in.
    StaleDivisionConfig {
        /// The id captured at generation time.
        captured: String,
        /// The id of the agent node the unit is attached under.
        actual: String,
    },
    /// A configuration section had the wrong shape.
    Config(ConfigError),
    /// A state tree write failed while assembling initial state.
    State(StateError),
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPortPath { process, port } => {
                write!(f, "process '{process}' port '{port}' has no topology entry")
            }
            Self::UndeclaredPort { process, port } => {
                write!(f, "topology wires undeclared port '{port}' of process '{process}'")
            }
            Self::TopologyMismatch { process } => {
                write!(f, "process '{process}' missing from processes or topology")
            }
            Self::NameCollision { location } => {
                write!(f, "a process already exists at {location}")
            }
            Self::PathEscape {
                process,
                port,
                source,
            } => write!(f, "process {process} port '{port}': {source}"),
            Self::UnknownProcess { location } => write!(f, "no process at {location}"),
            Self::StaleDivisionConfig { captured, actual } => write!(
                f,
                "division config captured agent '{captured}' but the unit lives in agent '{actual}'"
            ),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
        }
    }
}

impl Error for ComposeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PathEscape { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            Self::State(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ComposeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StateError> for ComposeError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}
