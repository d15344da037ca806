//! Composers for the inclusion-body agent and its lattice environment,
//! plus the experiments that run them.
//!
//! [`InclusionBodyGrowth`] wires five processes around one agent node;
//! [`Lattice`] holds an `agents` collection. Agents are generated at the
//! root and merged beneath `('agents', <id>)`, either by hand or through a
//! [`Hierarchy`](inclusion_compose::Hierarchy).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod experiments;
pub mod inclusion_body_growth;
pub mod lattice;

pub use experiments::{run_inclusion_body, run_lattice_experiment, ExperimentRun};
pub use inclusion_body_growth::InclusionBodyGrowth;
pub use lattice::{make_lattice_config, Lattice};
