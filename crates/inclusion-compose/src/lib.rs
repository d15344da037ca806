//! Process composition for inclusion-body agents.
//!
//! Defines the [`Process`] trait and everything needed to assemble
//! processes into agents and agents into environments:
//!
//! - [`Schema`] / [`PortSchema`] / [`Variable`]: declared ports, update and
//!   division rules.
//! - [`Topology`]: port → relative path wiring, checked by
//!   [`validate_wiring`].
//! - [`Composite`]: processes placed at absolute locations, with
//!   [`merge`](Composite::merge) for multi-scale attachment.
//! - [`Composer`] / [`CompositeFactory`]: configurable recipes that
//!   generate composites and their initial state.
//! - [`Hierarchy`]: declarative multi-scale composition.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod composer;
pub mod composite;
pub mod context;
pub mod error;
pub mod hierarchy;
pub mod process;
pub mod schema;
pub mod topology;
pub mod update;

pub use composer::{ComposeContext, Composer, CompositeFactory, INITIAL_STATE_CONFIG};
pub use composite::{Composite, Placement, Processes, ResolvedTopology, Signature};
pub use context::StepContext;
pub use error::ComposeError;
pub use hierarchy::{compose_hierarchy, Hierarchy};
pub use process::Process;
pub use schema::{Divider, PortSchema, Schema, Updater, Variable};
pub use topology::{validate_wiring, wiring, Topology, Wiring};
pub use update::{Daughter, DivideRequest, Structural, Update};
