//! The [`Process`] trait.
//!
//! Processes are the unit of behaviour inside an agent. Each declares named
//! ports at construction; a topology binds every port to a path in the
//! state tree, and the engine calls [`Process::next_update`] once per step
//! with the values found at those paths.

use inclusion_core::{Config, ConfigError, ProcessError, StepId, Tree};

use crate::context::StepContext;
use crate::schema::Schema;
use crate::update::Update;

/// A stateless operator over its ports.
///
/// # Contract
///
/// - `ports_schema()` is fixed for the lifetime of the process.
/// - `next_update()` takes `&self`: it returns an [`Update`] and never
///   mutates the tree directly. The engine merges updates with each
///   variable's updater after all non-derivers have run.
/// - Derivers run after that merge, in order, and see the merged state.
/// - A process that keeps internal state across steps must undo the
///   changes made for a step when [`Process::rollback`] names it.
///
/// # Examples
///
/// ```
/// use inclusion_compose::{PortSchema, Process, StepContext, Update, Variable};
/// use inclusion_compose::schema::{schema, Schema};
/// use inclusion_core::ProcessError;
///
/// struct Decay;
///
/// impl Process for Decay {
///     fn name(&self) -> &str { "decay" }
///
///     fn ports_schema(&self) -> Schema {
///         schema([("mass", PortSchema::Leaf(Variable::new(1.0)))])
///     }
///
///     fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
///         let mass = ctx.leaf_f64("mass")?;
///         Ok(Update::new().with("mass", -0.1 * mass * ctx.dt()))
///     }
/// }
///
/// assert!(Decay.ports_schema().contains_key("mass"));
/// ```
pub trait Process: Send + 'static {
    /// Human-readable kind, for logs and errors.
    fn name(&self) -> &str;

    /// Declared ports and the variables behind them.
    fn ports_schema(&self) -> Schema;

    /// Whether this process runs in the deriver phase.
    fn is_deriver(&self) -> bool {
        false
    }

    /// Port-keyed initial values this process chooses itself.
    ///
    /// Composers call this with the process's section of
    /// `initial_state_config` merged with caller overrides. Schema defaults
    /// are filled in afterwards wherever no process chose a value, so the
    /// default implementation chooses nothing.
    fn initial_state(&self, config: &Config) -> Result<Tree, ConfigError> {
        let _ = config;
        Ok(Tree::new())
    }

    /// Compute this step's update from the port view.
    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError>;

    /// Step `step` was rolled back; forget any internal progress made while
    /// computing its update.
    fn rollback(&self, step: StepId) {
        let _ = step;
    }
}
