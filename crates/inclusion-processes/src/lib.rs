//! Reference processes for inclusion-body agents and their environment.
//!
//! # Agent step order
//!
//! 1. [`InclusionBody`], [`GrowthRate`] update molecules and aggregates.
//! 2. [`MetaDivision`] requests division when the boundary flag is set.
//! 3. Derivers: [`EcoliShape`] recomputes geometry, [`DivideCondition`]
//!    compares biomass against its threshold.
//!
//! [`Multibody`] runs at the environment level over the agents collection.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod divide_condition;
pub mod ecoli_shape;
pub mod growth_rate;
pub mod inclusion_body;
pub mod meta_division;
pub mod multibody;

pub use divide_condition::DivideCondition;
pub use ecoli_shape::EcoliShape;
pub use growth_rate::GrowthRate;
pub use inclusion_body::InclusionBody;
pub use meta_division::{daughter_ids, DivisionPhase, MetaDivision};
pub use multibody::{Multibody, MultibodyBuilder};
