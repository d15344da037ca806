//! Division trigger that re-instantiates its own agent.
//!
//! The unit captures, at generation time, the id of the agent it lives in,
//! the path daughters are generated at, and a [`CompositeFactory`] for the
//! agent's composer. When it observes `divide` on its `global` port it asks
//! the engine (through a [`Structural::Divide`] request on its `agents`
//! port) to replace the mother with two daughters, each generated from the
//! captured factory with `agent_id` overridden.
//!
//! Phases move Idle → Triggered → Executed; a unit that has executed
//! ignores the flag from then on. The only way back is a rollback of the
//! step the request was emitted in, which returns the unit to Idle.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use inclusion_compose::schema::schema;
use inclusion_compose::{
    CompositeFactory, Daughter, DivideRequest, PortSchema, Process, Schema, StepContext,
    Structural, Update, Variable,
};
use inclusion_core::{Config, ConfigError, Path, ProcessError, StepId};
use tracing::debug;

/// Lifecycle of a division unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivisionPhase {
    /// Waiting for the flag.
    Idle = 0,
    /// Flag observed; request being built.
    Triggered = 1,
    /// Request emitted. Terminal once the step commits.
    Executed = 2,
}

impl DivisionPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Triggered,
            _ => Self::Executed,
        }
    }
}

/// Ids for the two daughters of `mother`.
pub fn daughter_ids(mother: &str) -> [String; 2] {
    [format!("{mother}0"), format!("{mother}1")]
}

/// The division unit.
pub struct MetaDivision {
    agent_id: String,
    daughter_path: Path,
    factory: CompositeFactory,
    phase: AtomicU8,
    executed_at: AtomicU64,
}

impl MetaDivision {
    /// Capture `agent_id` (required) and `daughter_path` (default `()`)
    /// from `config`, and the factory daughters are generated from.
    pub fn new(config: &Config, factory: CompositeFactory) -> Result<Self, ConfigError> {
        Ok(Self {
            agent_id: config.str("agent_id")?.to_string(),
            daughter_path: config.path_or("daughter_path", Path::here())?,
            factory,
            phase: AtomicU8::new(DivisionPhase::Idle as u8),
            executed_at: AtomicU64::new(0),
        })
    }

    /// The agent id captured at generation.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Where daughters are generated inside their agent node.
    pub fn daughter_path(&self) -> &Path {
        &self.daughter_path
    }

    /// Current phase.
    pub fn phase(&self) -> DivisionPhase {
        DivisionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn request(&self) -> DivideRequest {
        let daughters = daughter_ids(&self.agent_id)
            .into_iter()
            .map(|key| Daughter {
                factory: self
                    .factory
                    .with_overrides(&Config::new().with("agent_id", key.as_str())),
                key,
                path: self.daughter_path.clone(),
            })
            .collect();
        DivideRequest {
            port: "agents".into(),
            mother: self.agent_id.clone(),
            daughters,
        }
    }
}

impl Process for MetaDivision {
    fn name(&self) -> &str {
        "MetaDivision"
    }

    fn ports_schema(&self) -> Schema {
        schema([
            (
                "global",
                PortSchema::branch([("divide", Variable::new(false).set().zero())]),
            ),
            ("agents", PortSchema::Glob),
        ])
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        if !ctx.flag("global", "divide")? {
            return Ok(Update::new());
        }
        let claimed = self.phase.compare_exchange(
            DivisionPhase::Idle as u8,
            DivisionPhase::Triggered as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if claimed.is_err() {
            debug!(agent = %self.agent_id, step = %ctx.step_id(), "division already executed");
            return Ok(Update::new());
        }
        let request = self.request();
        self.executed_at.store(ctx.step_id().0, Ordering::Release);
        self.phase
            .store(DivisionPhase::Executed as u8, Ordering::Release);
        Ok(Update::new().with_structural(Structural::Divide(request)))
    }

    fn rollback(&self, step: StepId) {
        if self.phase() == DivisionPhase::Executed
            && self.executed_at.load(Ordering::Acquire) == step.0
        {
            self.phase.store(DivisionPhase::Idle as u8, Ordering::Release);
            debug!(agent = %self.agent_id, step = %step, "division rolled back");
        }
    }
}

impl std::fmt::Debug for MetaDivision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaDivision")
            .field("agent_id", &self.agent_id)
            .field("daughter_path", &self.daughter_path)
            .field("phase", &self.phase())
            .finish()
    }
}
