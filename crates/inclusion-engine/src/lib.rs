//! Lockstep engine for inclusion-body agent composites.
//!
//! Provides [`Engine`], a single-threaded step loop with rollback
//! atomicity and division-aware topology mutation, configured through
//! [`EngineConfig`]. Runs are recorded as a [`Trajectory`] of full-tree
//! snapshots; divisions as [`DivisionEvent`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod division;
pub mod emitter;
pub mod engine;
pub mod experiment;
pub mod metrics;

pub use config::{ConfigError, EngineConfig, StepError};
pub use emitter::{Record, Trajectory};
pub use engine::{Engine, StepReport};
pub use experiment::{compose_experiment, run_experiment, ExperimentError, ExperimentRun};
pub use metrics::{DivisionEvent, StepMetrics};
