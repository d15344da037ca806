//! Inclusion: agent composition and division for inclusion-body bacteria.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the `inclusion-*` sub-crates. For most users, adding `inclusion` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use inclusion::prelude::*;
//!
//! // One agent generated at the root and placed under /agents/0.
//! let factory = CompositeFactory::new(
//!     InclusionBodyGrowth,
//!     &Config::new().with("agent_id", "0"),
//! );
//! let at = AbsolutePath::new(["agents", "0"]);
//! let composite = factory.generate(&at).unwrap();
//!
//! let mut state = Tree::new();
//! state
//!     .place(&at, Value::Map(factory.initial_state(&Config::new()).unwrap()))
//!     .unwrap();
//!
//! let mut engine = Engine::new(EngineConfig::new(composite, state)).unwrap();
//! engine.update(10.0).unwrap();
//! assert_eq!(engine.trajectory().len(), 11);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `inclusion-core` | Paths, state trees, config, core errors |
//! | [`compose`] | `inclusion-compose` | Process trait, composers, composites, hierarchy |
//! | [`processes`] | `inclusion-processes` | Growth, damage, shape, division, multibody |
//! | [`engine`] | `inclusion-engine` | Lockstep engine and trajectories |
//! | [`composites`] | `inclusion-composites` | Agent and lattice composers, experiments |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Paths, state trees, and configuration (`inclusion-core`).
///
/// Path resolution ([`types::AbsolutePath::resolve`]) is where `..`
/// escapes are caught.
pub use inclusion_core as types;

/// Composition (`inclusion-compose`).
///
/// The [`compose::Process`] and [`compose::Composer`] traits are the main
/// extension points; [`compose::Hierarchy`] declares multi-scale layouts.
pub use inclusion_compose as compose;

/// Reference processes (`inclusion-processes`).
pub use inclusion_processes as processes;

/// The lockstep engine (`inclusion-engine`).
///
/// [`engine::Engine`] steps a composite, applying divisions atomically.
pub use inclusion_engine as engine;

/// Agent and environment composers (`inclusion-composites`).
pub use inclusion_composites as composites;

/// Common imports for typical usage.
///
/// ```rust
/// use inclusion::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use inclusion_core::{tree, AbsolutePath, Config, Path, StepId, Tree, TreeExt, Value};

    // Errors
    pub use inclusion_core::{ConfigError, PathError, ProcessError, StateError};
    pub use inclusion_compose::ComposeError;
    pub use inclusion_engine::{ExperimentError, StepError};

    // Composition
    pub use inclusion_compose::{
        Composer, Composite, CompositeFactory, Hierarchy, PortSchema, Process, Schema,
        StepContext, Topology, Update,
    };

    // Engine
    pub use inclusion_engine::{Engine, EngineConfig, StepMetrics, Trajectory};

    // Composers
    pub use inclusion_composites::{InclusionBodyGrowth, Lattice};
}
