//! Error types shared across the inclusion workspace.
//!
//! Organized by concern: path resolution, state tree shape, configuration
//! lookup, and process execution. Composition errors live in
//! `inclusion-compose`, engine errors in `inclusion-engine`.

use std::error::Error;
use std::fmt;

use crate::path::{AbsolutePath, Path};

/// Errors from resolving a relative [`Path`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathError {
    /// A back-reference climbed above the tree root.
    Escape {
        /// The node the path was resolved against.
        base: AbsolutePath,
        /// The offending relative path.
        path: Path,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escape { base, path } => {
                write!(f, "path {path} escapes the tree root from {base}")
            }
        }
    }
}

impl Error for PathError {}

/// Errors from reading or writing the state tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// A write tried to descend through a leaf value.
    NotABranch {
        /// Path of the leaf that blocked the descent.
        path: AbsolutePath,
    },
    /// Only a map may replace the whole tree.
    RootAssignment,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotABranch { path } => write!(f, "cannot descend through leaf at {path}"),
            Self::RootAssignment => write!(f, "the tree root can only be replaced by a map"),
        }
    }
}

impl Error for StateError {}

/// Errors from typed configuration lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent.
    Missing {
        /// The missing key.
        key: String,
    },
    /// A key is present but holds the wrong kind of value.
    WrongType {
        /// The offending key.
        key: String,
        /// What the accessor expected (e.g. `"float"`).
        expected: &'static str,
    },
    /// A key holds a value outside its valid range.
    Invalid {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing required config key '{key}'"),
            Self::WrongType { key, expected } => {
                write!(f, "config key '{key}' is not a {expected}")
            }
            Self::Invalid { key, reason } => write!(f, "config key '{key}': {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Errors from a single process update.
///
/// Returned by `Process::next_update()` and wrapped with the process
/// location by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessError {
    /// The process asked for a port it was not handed.
    MissingPort {
        /// The port name.
        port: String,
    },
    /// A port value has the wrong shape for the process.
    BadPortValue {
        /// The port name.
        port: String,
        /// Description of what was expected.
        reason: String,
    },
    /// The process failed for its own reasons.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPort { port } => write!(f, "port '{port}' not wired"),
            Self::BadPortValue { port, reason } => write!(f, "port '{port}': {reason}"),
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
        }
    }
}

impl Error for ProcessError {}
